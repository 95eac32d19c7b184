//! Client-side id minting for duplicated annotations.

use doc_model::AnnotationId;
use std::time::{SystemTime, UNIX_EPOCH};

/// Millisecond-timestamp ids, bumped when two are minted in the same millisecond.
#[derive(Debug, Default)]
pub struct TimestampIds {
    last: i64,
}

impl TimestampIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> AnnotationId {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or_default();

        self.last = now.max(self.last + 1);
        AnnotationId::Number(self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_and_increasing() {
        let mut ids = TimestampIds::new();
        let minted: Vec<AnnotationId> = (0..100).map(|_| ids.next_id()).collect();

        let unique: HashSet<_> = minted.iter().cloned().collect();
        assert_eq!(unique.len(), minted.len());
        assert!(minted.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
