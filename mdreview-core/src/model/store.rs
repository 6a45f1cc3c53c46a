use super::{Annotation, AnnotationId, Target};

/// In-memory annotations for one review session
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
    next_order: u64,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self {
            annotations: Vec::new(),
            next_order: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Hand out the next creation counter value
    pub fn next_order(&mut self) -> u64 {
        let order = self.next_order;
        self.next_order += 1;
        order
    }

    pub fn insert(&mut self, annotation: Annotation) -> AnnotationId {
        let id = annotation.id;
        self.annotations.push(annotation);
        id
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn for_unit(&self, unit_id: &str) -> Option<&Annotation> {
        self.annotations
            .iter()
            .find(|a| a.unit_id() == Some(unit_id))
    }

    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.annotations.iter_mut().find(|a| a.id == id)
    }

    pub fn find_by_target_mut(&mut self, target: &Target) -> Option<&mut Annotation> {
        self.annotations.iter_mut().find(|a| a.target == *target)
    }

    /// Annotation for a unit, created with defaults on first touch
    pub fn unit_entry(&mut self, unit_id: &str) -> &mut Annotation {
        let pos = match self
            .annotations
            .iter()
            .position(|a| a.unit_id() == Some(unit_id))
        {
            Some(pos) => pos,
            None => {
                let order = self.next_order();
                self.annotations.push(Annotation::for_unit(unit_id, order));
                self.annotations.len() - 1
            }
        };
        &mut self.annotations[pos]
    }

    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let pos = self.annotations.iter().position(|a| a.id == id)?;
        Some(self.annotations.remove(pos))
    }

    /// Drop every annotation, returning how many were removed
    pub fn clear(&mut self) -> usize {
        let removed = self.annotations.len();
        self.annotations.clear();
        removed
    }

    /// Get annotations in creation order
    pub fn sorted(&self) -> Vec<&Annotation> {
        let mut sorted: Vec<_> = self.annotations.iter().collect();
        sorted.sort_by_key(|a| a.created_order);
        sorted
    }
}

impl Default for AnnotationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LineRange;

    #[test]
    fn test_unit_entry_is_created_once() {
        let mut store = AnnotationStore::new();

        store.unit_entry("block-1").approved = Some(false);
        store.unit_entry("block-1").comment = "tighten".to_string();

        assert_eq!(store.len(), 1);
        let ann = store.for_unit("block-1").unwrap();
        assert!(!ann.is_approved());
        assert_eq!(ann.comment, "tighten");
    }

    #[test]
    fn test_remove_missing_is_none() {
        let mut store = AnnotationStore::new();
        let order = store.next_order();
        let id = store.insert(Annotation::for_lines(LineRange::single(0), "x".into(), order));

        assert!(store.remove(uuid::Uuid::new_v4()).is_none());
        assert_eq!(store.len(), 1);
        assert!(store.remove(id).is_some());
        assert!(store.remove(id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_sorted_follows_creation_order() {
        let mut store = AnnotationStore::new();
        let first = store.next_order();
        let second = store.next_order();
        store.insert(Annotation::for_lines(LineRange::single(5), "later".into(), second));
        store.insert(Annotation::for_lines(LineRange::single(9), "earlier".into(), first));

        let comments: Vec<_> = store.sorted().iter().map(|a| a.comment.as_str()).collect();
        assert_eq!(comments, vec!["earlier", "later"]);
    }

    #[test]
    fn test_get_mut_addresses_one_of_equal_targets() {
        let mut store = AnnotationStore::new();
        let first = store.next_order();
        store.insert(Annotation::for_lines(LineRange::single(0), "first".into(), first));
        let second = store.next_order();
        let id = store.insert(Annotation::for_lines(LineRange::single(0), "second".into(), second));

        store.get_mut(id).unwrap().comment = "edited".to_string();

        let comments: Vec<_> = store.sorted().iter().map(|a| a.comment.as_str()).collect();
        assert_eq!(comments, vec!["first", "edited"]);
        assert!(store.get_mut(uuid::Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_clear_reports_count() {
        let mut store = AnnotationStore::new();
        for line in 0..3 {
            let order = store.next_order();
            store.insert(Annotation::for_lines(LineRange::single(line), String::new(), order));
        }
        assert_eq!(store.clear(), 3);
        assert!(store.is_empty());
        assert_eq!(store.clear(), 0);
    }
}
