//! Per-language content metadata.
//!
//! A document owns one [`Attachment`] per language. The bytes themselves live
//! in the node store as immutable blobs; an attachment only points at the
//! blob holding its current content.
//!
//! Lookups never fail on a missing language: [`Attachments::resolve`] falls
//! back to the first language that was added.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ModelError;
use crate::key::UserId;

/// Content metadata for one language variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub language: String,
    pub filename: String,
    pub title: String,
    pub description: String,
    /// Size of the stored content in bytes
    pub size: u64,
    pub content_type: String,
    pub created_by: UserId,
    pub created: DateTime<Utc>,
    pub updated_by: Option<UserId>,
    pub updated: Option<DateTime<Utc>>,
    /// Form attached to the content, if any
    pub xml_form_id: Option<String>,
    /// Blob holding the bytes; `None` until content is stored
    pub content_id: Option<Uuid>,
}

impl Attachment {
    pub fn builder(language: impl Into<String>) -> AttachmentBuilder {
        AttachmentBuilder::new(language)
    }
}

/// Fluent builder for [`Attachment`].
#[derive(Debug, Clone)]
pub struct AttachmentBuilder {
    language: String,
    filename: Option<String>,
    title: String,
    description: String,
    size: u64,
    content_type: String,
    created_by: Option<UserId>,
    created: Option<DateTime<Utc>>,
    xml_form_id: Option<String>,
}

impl AttachmentBuilder {
    fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            filename: None,
            title: String::new(),
            description: String::new(),
            size: 0,
            content_type: "application/octet-stream".to_string(),
            created_by: None,
            created: None,
            xml_form_id: None,
        }
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn created(mut self, by: impl Into<UserId>, at: DateTime<Utc>) -> Self {
        self.created_by = Some(by.into());
        self.created = Some(at);
        self
    }

    pub fn xml_form_id(mut self, form_id: impl Into<String>) -> Self {
        self.xml_form_id = Some(form_id.into());
        self
    }

    pub fn build(self) -> Result<Attachment, ModelError> {
        let filename = self
            .filename
            .filter(|f| !f.is_empty())
            .ok_or(ModelError::IncompleteAttachment("filename"))?;
        let created_by = self
            .created_by
            .ok_or(ModelError::IncompleteAttachment("creator"))?;
        Ok(Attachment {
            language: self.language,
            filename,
            title: self.title,
            description: self.description,
            size: self.size,
            content_type: self.content_type,
            created_by,
            created: self.created.unwrap_or_else(Utc::now),
            updated_by: None,
            updated: None,
            xml_form_id: self.xml_form_id,
            content_id: None,
        })
    }
}

/// Language → attachment mapping, iterated in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachments(IndexMap<String, Attachment>);

impl Attachments {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn single(attachment: Attachment) -> Self {
        let mut map = Self::new();
        map.put(attachment);
        map
    }

    /// Exact language lookup.
    pub fn get(&self, language: &str) -> Option<&Attachment> {
        self.0.get(language)
    }

    pub fn get_mut(&mut self, language: &str) -> Option<&mut Attachment> {
        self.0.get_mut(language)
    }

    /// Lookup with fallback to the first available language.
    pub fn resolve(&self, language: &str) -> Option<&Attachment> {
        self.0
            .get(language)
            .or_else(|| self.0.get_index(0).map(|(_, a)| a))
    }

    /// Insert or replace the variant for `attachment.language`.
    ///
    /// Replacing keeps the slot position, so fallback order is stable.
    /// Returns the replaced variant.
    pub fn put(&mut self, attachment: Attachment) -> Option<Attachment> {
        self.0.insert(attachment.language.clone(), attachment)
    }

    /// Remove a language, preserving the order of the remaining ones.
    pub fn remove(&mut self, language: &str) -> Option<Attachment> {
        self.0.shift_remove(language)
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attachment> {
        self.0.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Attachment> {
        self.0.values_mut()
    }

    /// Blob ids referenced by any language.
    pub fn content_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.0.values().filter_map(|a| a.content_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(language: &str, title: &str) -> Attachment {
        Attachment::builder(language)
            .filename("test.pdf")
            .title(title)
            .size(14)
            .content_type("application/pdf")
            .created("0", Utc::now())
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_requires_filename_and_creator() {
        let err = Attachment::builder("en").created("0", Utc::now()).build();
        assert_eq!(err.unwrap_err(), ModelError::IncompleteAttachment("filename"));

        let err = Attachment::builder("en").filename("a.txt").build();
        assert_eq!(err.unwrap_err(), ModelError::IncompleteAttachment("creator"));
    }

    #[test]
    fn test_resolve_falls_back_to_first_language() {
        let mut map = Attachments::new();
        map.put(attachment("fr", "Mon document"));
        map.put(attachment("de", "Mein Dokument"));

        assert_eq!(map.resolve("de").unwrap().title, "Mein Dokument");
        assert_eq!(map.resolve("en").unwrap().title, "Mon document");
        assert_eq!(map.resolve("en").unwrap().language, "fr");
        assert!(map.get("en").is_none());
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut map = Attachments::new();
        map.put(attachment("fr", "v1"));
        map.put(attachment("en", "english"));
        let old = map.put(attachment("fr", "v2"));
        assert_eq!(old.unwrap().title, "v1");
        assert_eq!(map.languages().collect::<Vec<_>>(), vec!["fr", "en"]);
        assert_eq!(map.resolve("it").unwrap().title, "v2");
    }

    #[test]
    fn test_remove_shifts_fallback() {
        let mut map = Attachments::new();
        map.put(attachment("fr", "fr"));
        map.put(attachment("en", "en"));
        map.remove("fr");
        assert_eq!(map.resolve("fr").unwrap().language, "en");
        map.remove("en");
        assert!(map.resolve("fr").is_none());
        assert!(map.is_empty());
    }
}
