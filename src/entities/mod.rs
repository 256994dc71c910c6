// Entity resolution: a remote extractor backed by a local fallback.
//
// EntityExtractor is the shared interface. GoogleNlpExtractor is the primary
// tier, OnnxNerTagger the local one, and EntityResolver decides which runs.

pub mod traits;
pub mod filter;
pub mod resolver;
pub mod google;
pub mod rate_limiter;
pub mod onnx;
pub mod download;
