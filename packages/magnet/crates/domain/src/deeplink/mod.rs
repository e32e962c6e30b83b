pub mod codec;
pub mod error;
pub mod link;
pub mod resolver;
pub mod vscode;

pub use codec::DecodeError;
pub use error::DeepLinkError;
pub use link::{build_link, encode_manifest, parse_link, DeepLinkPayload, ParsedLink, DEFAULT_SCHEME};
pub use resolver::{DeepLinkResolver, ResolvedLink};
