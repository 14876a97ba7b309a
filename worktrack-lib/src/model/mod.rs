//! Object identifiers and the asset handle yielded by queries.
//!
//! The full domain layer (schema-driven entity mapping) lives outside this
//! crate; queries yield [`Asset`] handles that expose the raw document,
//! the snapshot marker it was fetched at, and a staged-update buffer that
//! [`Asset::commit`] posts as an XML diff document.

use std::fmt;
use std::str::FromStr;

use crate::WorktrackClient;
use crate::error::Error;
use crate::xml::Element;

/// A `<TypeName>:<numericId>` object identifier, optionally carrying a
/// third moment component for historical references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Oid {
    /// Asset type name, e.g. `Story`.
    pub asset_type: String,
    /// Server-assigned numeric identifier.
    pub id: u64,
    /// Snapshot moment, present on historical references.
    pub moment: Option<u64>,
}

impl Oid {
    /// Parses a `Type:id` or `Type:id:moment` token.
    pub fn parse(token: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidOid(token.to_string());
        let mut parts = token.split(':');

        let asset_type = parts.next().filter(|t| !t.is_empty()).ok_or_else(invalid)?;
        let id = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let moment = match parts.next() {
            Some(part) => Some(part.parse().map_err(|_| invalid())?),
            None => None,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self {
            asset_type: asset_type.to_string(),
            id,
            moment,
        })
    }

    /// The momentless `Type:id` token.
    pub fn token(&self) -> String {
        format!("{}:{}", self.asset_type, self.id)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.moment {
            Some(moment) => write!(f, "{}:{}:{}", self.asset_type, self.id, moment),
            None => write!(f, "{}:{}", self.asset_type, self.id),
        }
    }
}

impl FromStr for Oid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// One matched asset: its document, the snapshot marker it was fetched
/// under, and field updates staged for commit.
#[derive(Debug, Clone)]
pub struct Asset {
    element: Element,
    asof: Option<String>,
    pending: Vec<(String, String)>,
}

impl Asset {
    pub(crate) fn new(element: Element, asof: Option<String>) -> Self {
        Self {
            element,
            asof,
            pending: Vec::new(),
        }
    }

    /// The underlying asset document.
    pub fn element(&self) -> &Element {
        &self.element
    }

    /// The snapshot marker this asset was fetched under, if historical.
    pub fn asof(&self) -> Option<&str> {
        self.asof.as_deref()
    }

    /// The asset's object identifier, parsed from the document's `id`
    /// attribute. Absent on documents the server returned without one.
    pub fn oid(&self) -> Option<Oid> {
        self.element.attr("id").and_then(|id| Oid::parse(id).ok())
    }

    /// The text value of a named `Attribute` child.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.element
            .find_all("Attribute")
            .find(|child| child.attr("name") == Some(name))
            .map(|child| child.text.as_str())
    }

    /// Stages one field update for a later [`commit`](Self::commit),
    /// overwriting an earlier staged value for the same field.
    pub fn stage(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.pending.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing_value)) => *existing_value = value,
            None => self.pending.push((name, value)),
        }
    }

    /// Whether any updates are staged.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// The staged updates in staging order.
    pub fn pending(&self) -> &[(String, String)] {
        &self.pending
    }

    /// Posts the staged updates as an XML diff document and clears the
    /// buffer. Returns `None` when nothing was staged.
    pub async fn commit(&mut self, client: &WorktrackClient) -> Result<Option<Element>, Error> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        let oid = self.oid().ok_or_else(|| {
            Error::InvalidOid("asset document carries no id attribute".to_string())
        })?;

        let mut document = Element::new("Asset");
        for (name, value) in &self.pending {
            document = document.with_child(
                Element::new("Attribute")
                    .with_attr("name", name.clone())
                    .with_attr("act", "set")
                    .with_text(value.clone()),
            );
        }

        let updated = client
            .update_asset(&oid.asset_type, &oid.id.to_string(), &document)
            .await?;
        self.pending.clear();
        Ok(Some(updated))
    }
}
