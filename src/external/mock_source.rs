use async_trait::async_trait;
use parking_lot::RwLock;

use super::{DocumentSource, ExternalError, SourceDocument};

/// In-memory list of documents used when the ERP cannot resolve a scan.
#[derive(Debug, Default)]
pub struct MockDocumentSource {
    docs: RwLock<Vec<SourceDocument>>,
}

impl MockDocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds documents, replacing entries with the same id. Returns the list size.
    pub fn add(&self, docs: Vec<SourceDocument>) -> usize {
        let mut current = self.docs.write();
        for doc in docs {
            match current.iter_mut().find(|d| d.doc_id == doc.doc_id) {
                Some(existing) => *existing = doc,
                None => current.push(doc),
            }
        }
        current.len()
    }

    pub fn list(&self) -> Vec<SourceDocument> {
        self.docs.read().clone()
    }

    pub fn find(&self, doc_id: &str) -> Option<SourceDocument> {
        self.docs.read().iter().find(|d| d.doc_id == doc_id).cloned()
    }

    pub fn clear(&self) -> usize {
        let mut docs = self.docs.write();
        let removed = docs.len();
        docs.clear();
        removed
    }
}

#[async_trait]
impl DocumentSource for MockDocumentSource {
    async fn resolve(
        &self,
        doc_id: &str,
        _: &str,
    ) -> Result<Option<SourceDocument>, ExternalError> {
        Ok(self.find(doc_id))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;

    fn source(id: &str, route: &str) -> SourceDocument {
        SourceDocument {
            doc_id: id.to_string(),
            status: None,
            route_id: route.to_string(),
            lot_nbr: None,
            whse_location_name: None,
            customer_id: "MOCKCUST1".to_string(),
            customer_name: "Mock Chemist".to_string(),
            customer_address: None,
            customer_city: None,
            customer_pin_code: None,
            customer_phone: None,
            doc_date: Utc::now(),
            doc_amount: Decimal::ONE,
        }
    }

    #[test]
    fn add_replaces_by_id() {
        let mock = MockDocumentSource::new();
        assert_eq!(mock.add(vec![source("D1", "R1"), source("D2", "R1")]), 2);
        assert_eq!(mock.add(vec![source("D1", "R9")]), 2);
        assert_eq!(mock.find("D1").unwrap().route_id, "R9");
        assert_eq!(mock.clear(), 2);
        assert!(mock.list().is_empty());
    }
}
