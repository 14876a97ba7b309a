//! Deferred query builder and execution engine.
//!
//! A [`Query`] accumulates selection fields, equality terms, a raw filter
//! expression, and snapshot markers, then hits the server exactly once when
//! results are first needed. Results are cached for the query's lifetime;
//! mutating the builder after the first execution never re-runs it.

mod terms;

use serde::Serialize;

use crate::WorktrackClient;
use crate::client::EmptySelection;
use crate::api::protocol::Body;
use crate::api::protocol::QueryParams;
use crate::error::Error;
use crate::model::Asset;
use crate::xml::DocumentKind;
use crate::xml::Element;

use terms::add_selection;
use terms::merge_term;
use terms::render_selection;
use terms::render_where;

/// Structured free-text search payload for the `query.v1` endpoint.
///
/// When attached to a query via [`Query::find`], the builder's selection,
/// where terms, and snapshot markers are ignored and execution switches to
/// the two-phase search flow.
#[derive(Debug, Clone, Serialize)]
pub struct FindSpec {
    /// Asset type to search; filled from the bound query when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Free text to search for.
    pub find: String,
    /// Attribute names to search in; server default when empty.
    #[serde(rename = "findin", skip_serializing_if = "Vec::is_empty")]
    pub find_in: Vec<String>,
}

impl FindSpec {
    /// Creates a search for the given text.
    pub fn new(find: impl Into<String>) -> Self {
        Self {
            from: None,
            find: find.into(),
            find_in: Vec::new(),
        }
    }

    /// Restricts the search to the given attribute names.
    pub fn find_in(mut self, fields: &[&str]) -> Self {
        self.find_in = fields.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Overrides the asset type to search.
    pub fn from_type(mut self, asset_type: impl Into<String>) -> Self {
        self.from = Some(asset_type.into());
        self
    }
}

/// Which read endpoint a request goes against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadApi {
    /// Current values.
    Data,
    /// Historical values at a snapshot moment.
    Hist,
}

impl ReadApi {
    fn segment(self) -> &'static str {
        match self {
            Self::Data => "Data",
            Self::Hist => "Hist",
        }
    }
}

/// A fluent, deferred query against one asset type.
///
/// Use [`WorktrackClient::query`] to create one. Builder calls chain by
/// value; [`assets`](Self::assets), [`first`](Self::first), and
/// [`field`](Self::field) trigger the network exchange on first use.
///
/// # Example
///
/// ```ignore
/// let mut query = client
///     .query("Story")
///     .select(&["Name", "Scope.Name"])
///     .where_eq("Owner.Nickname", "joe")
///     .filter("Estimate>'5'");
///
/// for asset in query.assets().await? {
///     println!("{:?}", asset.attribute("Name"));
/// }
/// ```
pub struct Query {
    client: WorktrackClient,
    asset_type: String,
    sel_list: Vec<String>,
    where_terms: Vec<(String, String)>,
    filter_expr: Option<String>,
    asof_list: Vec<Option<String>>,
    find_spec: Option<FindSpec>,
    results: Option<Vec<(DocumentKind, Option<String>)>>,
}

impl Query {
    pub(crate) fn new(client: WorktrackClient, asset_type: impl Into<String>) -> Self {
        Self {
            client,
            asset_type: asset_type.into(),
            sel_list: Vec::new(),
            where_terms: Vec::new(),
            filter_expr: None,
            asof_list: Vec::new(),
            find_spec: None,
            results: None,
        }
    }

    /// The asset type this query is bound to.
    pub fn asset_type(&self) -> &str {
        &self.asset_type
    }

    /// Adds attribute paths to the selection list.
    ///
    /// A dotted path such as `"Scope.Name"` also selects its prefixes
    /// (`"Scope"`), so intermediate reference objects come back alongside
    /// the final value. Exact duplicates are suppressed.
    pub fn select(mut self, fields: &[&str]) -> Self {
        for field in fields {
            add_selection(&mut self.sel_list, field);
        }
        self
    }

    /// Merges one equality term into the criteria; a later call with the
    /// same attribute name overwrites the earlier value.
    ///
    /// Rendered as `name='value'` with the value substituted literally —
    /// the caller is responsible for value safety.
    pub fn where_eq(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        merge_term(&mut self.where_terms, name.into(), value.into());
        self
    }

    /// Merges several equality terms at once.
    pub fn where_terms<I, K, V>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in terms {
            merge_term(&mut self.where_terms, name.into(), value.into());
        }
        self
    }

    /// Sets or replaces the raw filter expression, joined to the equality
    /// terms with `;` (the server's AND) at execution time.
    pub fn filter(mut self, expression: impl Into<String>) -> Self {
        self.filter_expr = Some(expression.into());
        self
    }

    /// Switches to structured-find mode.
    ///
    /// If the spec has no `from`, the bound asset type is filled in. While
    /// a find spec is attached, `select`/`where_eq`/`asof` state is ignored
    /// for request construction.
    pub fn find(mut self, mut spec: FindSpec) -> Self {
        if spec.from.is_none() {
            spec.from = Some(self.asset_type.clone());
        }
        self.find_spec = Some(spec);
        self
    }

    /// Adds snapshot markers, one request per marker, order preserved.
    ///
    /// `None` targets the current read endpoint; `Some(moment)` targets the
    /// historical endpoint with `asof=<moment>`.
    pub fn asof<I, M>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<Option<String>>,
    {
        for marker in markers {
            self.asof_list.push(marker.into());
        }
        self
    }

    /// Runs the query if it has not run yet.
    ///
    /// Execution happens at most once per query; repeated calls (and
    /// repeated iteration) reuse the cached results, even if builder state
    /// was mutated in between.
    pub async fn execute(&mut self) -> Result<(), Error> {
        if self.results.is_some() {
            return Ok(());
        }
        let results = match &self.find_spec {
            Some(spec) => self.run_find(spec).await?,
            None => self.run_select().await?,
        };
        self.results = Some(results);
        Ok(())
    }

    /// Executes if needed and returns the matched assets in order.
    ///
    /// Each single-asset document yields one asset; each collection
    /// document yields one asset per contained entity, all tagged with the
    /// document's snapshot marker.
    pub async fn assets(&mut self) -> Result<Vec<Asset>, Error> {
        self.execute().await?;
        Ok(self.cached_assets())
    }

    /// The first matched asset; [`Error::NoResults`] when nothing matched.
    pub async fn first(&mut self) -> Result<Asset, Error> {
        self.assets()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NoResults {
                asset_type: self.asset_type.clone(),
            })
    }

    /// Deferred attribute accessor.
    ///
    /// If the query has not run yet, `name` is added to the selection list
    /// first, then the query executes (once). Returns the attribute's text
    /// value per matched asset in iteration order; attributes absent from a
    /// result document come back as `None`.
    pub async fn field(&mut self, name: &str) -> Result<Vec<Option<String>>, Error> {
        if self.results.is_none() {
            add_selection(&mut self.sel_list, name);
        }
        let assets = self.assets().await?;
        Ok(assets
            .iter()
            .map(|asset| asset.attribute(name).map(str::to_string))
            .collect())
    }

    /// Stages field updates on every matched asset.
    ///
    /// Nothing is written to the server here; commit each returned asset to
    /// post its staged changes.
    pub async fn set<I, K, V>(&mut self, updates: I) -> Result<Vec<Asset>, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let staged: Vec<(String, String)> = updates
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        let mut assets = self.assets().await?;
        for asset in &mut assets {
            for (name, value) in &staged {
                asset.stage(name.clone(), value.clone());
            }
        }
        Ok(assets)
    }

    /// The cached result documents with their markers, if the query ran.
    pub fn results(&self) -> Option<&[(DocumentKind, Option<String>)]> {
        self.results.as_deref()
    }

    fn cached_assets(&self) -> Vec<Asset> {
        let mut assets = Vec::new();
        if let Some(results) = &self.results {
            for (document, marker) in results {
                for element in document.assets() {
                    assets.push(Asset::new(element.clone(), marker.clone()));
                }
            }
        }
        assets
    }

    /// Two-phase structured find: POST the payload, then fetch each
    /// returned identifier as a full asset document. A failed fetch aborts
    /// the remaining batch.
    async fn run_find(
        &self,
        spec: &FindSpec,
    ) -> Result<Vec<(DocumentKind, Option<String>)>, Error> {
        let payload = serde_json::to_vec(spec)?;
        let value = self
            .client
            .get_json("rest-1.v1/query.v1", Some(Body::Raw(payload)))
            .await?;

        let ids = parse_find_oids(&value)?;
        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            let document = self.client.get_asset_xml(&self.asset_type, &id, None).await?;
            results.push((DocumentKind::classify(document), None));
        }
        Ok(results)
    }

    async fn run_select(&self) -> Result<Vec<(DocumentKind, Option<String>)>, Error> {
        let mut params = QueryParams::new();
        let sel = render_selection(&self.sel_list);
        if !sel.is_empty() || self.client.empty_selection() == EmptySelection::SendEmpty {
            params.push("sel", sel);
        }
        let where_string = render_where(&self.where_terms, self.filter_expr.as_deref());
        if !where_string.is_empty() {
            params.push("where", where_string);
        }

        if self.asof_list.is_empty() {
            let document = self.run_single(&params, ReadApi::Data).await?;
            return Ok(vec![(DocumentKind::classify(document), None)]);
        }

        let mut results = Vec::with_capacity(self.asof_list.len());
        for marker in &self.asof_list {
            let mut params = params.clone();
            let api = match marker {
                Some(moment) => {
                    params.push("asof", moment.clone());
                    ReadApi::Hist
                }
                None => ReadApi::Data,
            };
            let document = self.run_single(&params, api).await?;
            results.push((DocumentKind::classify(document), marker.clone()));
        }
        Ok(results)
    }

    async fn run_single(&self, params: &QueryParams, api: ReadApi) -> Result<Element, Error> {
        let path = format!("rest-1.v1/{}/{}", api.segment(), self.asset_type);
        self.client.get_xml(&path, Some(params), None).await
    }
}

/// Pulls asset identifiers out of a find response.
///
/// The endpoint answers with a JSON array whose first element is an array
/// of objects each carrying an `_oid` like `Story:1126`; the data endpoint
/// wants the part after the type prefix.
fn parse_find_oids(value: &serde_json::Value) -> Result<Vec<String>, Error> {
    let rows = match value {
        serde_json::Value::Array(outer) => match outer.first() {
            Some(serde_json::Value::Array(rows)) => rows.as_slice(),
            _ => outer.as_slice(),
        },
        _ => {
            return Err(Error::Protocol {
                message: format!("unexpected find response shape: {value}"),
            });
        }
    };

    Ok(rows
        .iter()
        .filter_map(|row| row.get("_oid").and_then(serde_json::Value::as_str))
        .map(|oid| oid.split_once(':').map_or(oid, |(_, rest)| rest).to_string())
        .collect())
}
