// Distinguished-name decomposition
//
// DNs are slash-delimited hierarchical paths ("uni/tn-prod/ap-web/
// epg-frontend", "topology/pod-1/node-101/sys/..."). Segment i is
// always the parent scope of segment i+1, and typed prefix markers
// ("pod-", "node-", "tn-", "ap-", "epg-") carry the identity the
// controller never exposes as separate fields. A DN is parsed exactly
// once into an ordered segment list; everything downstream operates on
// the parsed value.

/// Remove a known literal prefix from a DN segment, yielding the bare
/// identifier. Passes the input through unchanged when the prefix is
/// absent — decomposition never fails on malformed input, it only
/// omits structure it cannot find.
pub fn strip_prefix<'a>(segment: &'a str, prefix: &str) -> &'a str {
    segment.strip_prefix(prefix).unwrap_or(segment)
}

/// A distinguished name parsed into ordered path segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dn {
    raw: String,
    segments: Vec<String>,
}

impl Dn {
    /// Parse a DN. Infallible: an empty string yields zero segments.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let segments = if raw.is_empty() {
            Vec::new()
        } else {
            raw.split('/').map(str::to_owned).collect()
        };
        Self { raw, segments }
    }

    /// The original wire-format string.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// All path segments, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// One path segment by index.
    pub fn segment(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    /// The first `depth` segments re-joined into a path — the grouping
    /// key for per-device (depth 3: topology/pod/node) and per-policy
    /// (depth 5: through tenant/app/EPG) aggregation. A shorter DN
    /// yields all of its segments.
    pub fn location_key(&self, depth: usize) -> String {
        self.segments
            .iter()
            .take(depth)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("/")
    }

    /// The DN minus its trailing relative-name component.
    pub fn parent(&self) -> Option<String> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(self.location_key(self.segments.len() - 1))
    }

    /// Pod number from a `topology/pod-N/...` DN.
    pub fn pod(&self) -> Option<&str> {
        self.segment(1).map(|s| strip_prefix(s, "pod-"))
    }

    /// Node id from a `topology/pod-N/node-M/...` DN.
    pub fn node(&self) -> Option<&str> {
        self.segment(2).map(|s| strip_prefix(s, "node-"))
    }

    /// Tenant name from a `uni/tn-T/...` DN.
    pub fn tenant(&self) -> Option<&str> {
        self.segment(1).map(|s| strip_prefix(s, "tn-"))
    }

    /// Application profile name from a `uni/tn-T/ap-A/...` DN.
    pub fn app(&self) -> Option<&str> {
        self.segment(2).map(|s| strip_prefix(s, "ap-"))
    }

    /// Endpoint-group name from a `uni/tn-T/ap-A/epg-E/...` DN.
    pub fn epg(&self) -> Option<&str> {
        self.segment(3).map(|s| strip_prefix(s, "epg-"))
    }
}
