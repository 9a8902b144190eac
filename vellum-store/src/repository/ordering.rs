use vellum_core::{DocumentKey, DocumentType, ForeignRef};

use super::DocumentRepository;
use crate::error::Result;
use crate::node::NodeStore;

impl<S: NodeStore> DocumentRepository<S> {
    /// Order a new sibling of `owner` would get for `requested`.
    pub fn next_order(
        &self,
        owner: &ForeignRef,
        document_type: DocumentType,
        requested: i32,
    ) -> Result<i32> {
        let bounds =
            self.min_max_order_indexes(&owner.container_id, &owner.foreign_id, document_type)?;
        Ok(self.config.order_policy().allocate(requested, bounds))
    }

    /// Renumber documents in the given sequence.
    ///
    /// Only documents whose order actually changes are written, each as a
    /// bypass operation (one technical entry per historized document).
    pub fn reorder(&mut self, keys: &[DocumentKey]) -> Result<()> {
        let mut documents = Vec::with_capacity(keys.len());
        for key in keys {
            documents.push(self.require(key.id)?);
        }
        let newest_first = documents.windows(2).all(|pair| {
            let (a, b) = (pair[0].state(), pair[1].state());
            (a.key.legacy_id, a.creation_date) > (b.key.legacy_id, b.creation_date)
        });

        let orders = self.config.order_policy().reorder_values(documents.len(), newest_first);
        for (document, order) in documents.iter().zip(orders) {
            if document.state().order != order {
                self.set_order(document.key(), order)?;
            }
        }
        log::debug!("Reordered {} documents (newest first: {newest_first})", keys.len());
        Ok(())
    }
}
