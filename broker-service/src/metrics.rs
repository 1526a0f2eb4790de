//! `/metrics` surface, nesting a `PrometheusExporter`
//! next to the OpenAPI routes rather than rolling a bespoke exporter.

use prometheus::Registry;

pub fn registry() -> Registry {
    prometheus::default_registry().clone()
}
