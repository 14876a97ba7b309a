//! Asset-scoped request helpers.
//!
//! Canonical paths for the `rest-1.v1` and `meta.v1` segments, built from
//! an asset type name, an object identifier, and an optional snapshot
//! moment. All of these delegate to `get_xml` and inherit its error
//! classification.

use crate::WorktrackClient;
use crate::api::protocol::Body;
use crate::api::protocol::QueryParams;
use crate::error::Error;
use crate::xml::Element;

impl WorktrackClient {
    /// Fetches one asset's full document, optionally at a snapshot moment.
    pub async fn get_asset_xml(
        &self,
        asset_type: &str,
        oid: &str,
        moment: Option<&str>,
    ) -> Result<Element, Error> {
        let path = match moment {
            Some(moment) => format!("rest-1.v1/Data/{asset_type}/{oid}/{moment}"),
            None => format!("rest-1.v1/Data/{asset_type}/{oid}"),
        };
        self.get_xml(&path, None, None).await
    }

    /// Runs a collection query with optional `sel` and `where` parameters.
    pub async fn get_query_xml(
        &self,
        asset_type: &str,
        sel: Option<&str>,
        where_terms: Option<&str>,
    ) -> Result<Element, Error> {
        let path = format!("rest-1.v1/Data/{asset_type}");
        let mut params = QueryParams::new();
        if let Some(sel) = sel {
            params.push("sel", sel);
        }
        if let Some(where_terms) = where_terms {
            params.push("where", where_terms);
        }
        let query = (!params.is_empty()).then_some(&params);
        self.get_xml(&path, query, None).await
    }

    /// Fetches the schema document for an asset type.
    pub async fn get_meta_xml(&self, asset_type: &str) -> Result<Element, Error> {
        self.get_xml(&format!("meta.v1/{asset_type}"), None, None).await
    }

    /// Fetches a single attribute of one asset, optionally at a moment.
    pub async fn get_attr(
        &self,
        asset_type: &str,
        oid: &str,
        attribute: &str,
        moment: Option<&str>,
    ) -> Result<Element, Error> {
        let path = match moment {
            Some(moment) => format!("rest-1.v1/Data/{asset_type}/{oid}/{moment}/{attribute}"),
            None => format!("rest-1.v1/Data/{asset_type}/{oid}/{attribute}"),
        };
        self.get_xml(&path, None, None).await
    }

    /// Invokes a server-side operation on one asset, e.g. `QuickClose`.
    pub async fn execute_operation(
        &self,
        asset_type: &str,
        oid: &str,
        operation: &str,
    ) -> Result<Element, Error> {
        let path = format!("rest-1.v1/Data/{asset_type}/{oid}");
        let mut params = QueryParams::new();
        params.push("op", operation);
        // Operations are POSTs with an empty form body.
        self.get_xml(&path, Some(&params), Some(Body::Form(Vec::new()))).await
    }

    /// Creates an asset by POSTing its XML document to the collection path.
    ///
    /// The optional context oid scopes creation to a parent asset.
    pub async fn create_asset(
        &self,
        asset_type: &str,
        document: &Element,
        context_oid: Option<&str>,
    ) -> Result<Element, Error> {
        let path = format!("rest-1.v1/Data/{asset_type}");
        let mut params = QueryParams::new();
        if let Some(context_oid) = context_oid {
            params.push("ctx", context_oid);
        }
        let query = (!params.is_empty()).then_some(&params);
        let body = Body::Raw(document.to_bytes()?);
        self.get_xml(&path, query, Some(body)).await
    }

    /// Updates an asset by POSTing an XML diff document to its instance path.
    pub async fn update_asset(
        &self,
        asset_type: &str,
        oid: &str,
        update_document: &Element,
    ) -> Result<Element, Error> {
        let path = format!("rest-1.v1/Data/{asset_type}/{oid}");
        let body = Body::Raw(update_document.to_bytes()?);
        self.get_xml(&path, None, Some(body)).await
    }
}
