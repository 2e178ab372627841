// Object-tree fetch primitives
//
// Generic read operations over an `ApicSession`: class queries with
// optional subtree inclusion, and MO queries scoped to one DN. Both are
// read-only and idempotent; neither retries — retry policy belongs to
// the caller. `ensure_fresh` runs before every read.

use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::mo::{ClassResponse, ManagedObject};
use crate::session::ApicSession;

impl ApicSession {
    /// Fetch every object of `class_name` fabric-wide.
    ///
    /// `GET /api/class/{class}.json`; a non-empty `subtree_classes`
    /// asks the controller to inline children of exactly those classes
    /// (`?rsp-subtree=children&rsp-subtree-class=a,b`).
    ///
    /// Zero matching objects returns `Ok(vec![])` — callers must treat
    /// no rows as a valid outcome, not a failure.
    pub async fn fetch_class(
        &self,
        class_name: &str,
        subtree_classes: &[&str],
    ) -> Result<Vec<ManagedObject>, Error> {
        self.ensure_fresh().await?;

        let mut url = self.base_url().join(&format!("api/class/{class_name}.json"))?;
        if !subtree_classes.is_empty() {
            url.query_pairs_mut()
                .append_pair("rsp-subtree", "children")
                .append_pair("rsp-subtree-class", &subtree_classes.join(","));
        }
        self.get_imdata(url).await
    }

    /// Fetch objects of `class_name` under one topology scope.
    ///
    /// `GET /api/node/class/{scope_dn}/{class}.json` — the node-local
    /// variant of a class query, used for per-device reads such as
    /// physical-interface state.
    pub async fn fetch_node_class(
        &self,
        scope_dn: &str,
        class_name: &str,
        subtree_classes: &[&str],
    ) -> Result<Vec<ManagedObject>, Error> {
        self.ensure_fresh().await?;

        let mut url = self
            .base_url()
            .join(&format!("api/node/class/{scope_dn}/{class_name}.json"))?;
        if !subtree_classes.is_empty() {
            url.query_pairs_mut()
                .append_pair("rsp-subtree", "children")
                .append_pair("rsp-subtree-class", &subtree_classes.join(","));
        }
        self.get_imdata(url).await
    }

    /// Fetch the object tree rooted at `dn`, restricted to immediate
    /// children of `subtree_class`.
    ///
    /// `GET /api/mo/{dn}.json?rsp-subtree=children&rsp-subtree-class={cls}`
    pub async fn fetch_mo(
        &self,
        dn: &str,
        subtree_class: &str,
    ) -> Result<Vec<ManagedObject>, Error> {
        self.ensure_fresh().await?;

        let mut url = self.base_url().join(&format!("api/mo/{dn}.json"))?;
        url.query_pairs_mut()
            .append_pair("rsp-subtree", "children")
            .append_pair("rsp-subtree-class", subtree_class);
        self.get_imdata(url).await
    }

    /// Send the GET and unwrap the `{totalCount, imdata}` envelope.
    async fn get_imdata(&self, url: Url) -> Result<Vec<ManagedObject>, Error> {
        debug!("GET {url}");

        let resp = self.http().get(url).send().await.map_err(Error::Transport)?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "session cookie expired or rejected".into(),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                message: format!("HTTP {status}: {}", &body[..body.len().min(200)]),
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;
        let envelope: ClassResponse = serde_json::from_str(&body).map_err(|e| {
            let preview = &body[..body.len().min(200)];
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })?;

        // Request-level failures arrive as a lone `error` record inside
        // an HTTP 200 envelope.
        if let Some(first) = envelope.imdata.first() {
            if first.class() == "error" {
                return Err(Error::Api {
                    message: first
                        .attr("text")
                        .unwrap_or("unspecified controller error")
                        .to_owned(),
                });
            }
        }

        Ok(envelope.imdata)
    }
}
