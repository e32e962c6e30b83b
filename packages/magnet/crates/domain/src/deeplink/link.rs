use super::codec;
use super::error::DeepLinkError;
use magnet_manifest::{Manifest, ManifestValidator};
use serde::Serialize;
use url::Url;

pub const DEFAULT_SCHEME: &str = "mcp-magnet";
pub const INSTALL_HOST: &str = "install";

const MANIFEST_PARAM: &str = "manifest";
const SIGNATURE_PARAM: &str = "signature";

/// Raw material extracted from a link, kept for signature verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeepLinkPayload {
    /// The `manifest` parameter exactly as received; signatures cover this string
    pub manifest_param: String,
    pub signature_param: Option<String>,
    /// Only set when a signature is present
    pub github_username: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLink {
    pub manifest: Manifest,
    pub payload: DeepLinkPayload,
}

/// Everything up to, but not including, key fetching and verification.
pub fn parse_link(scheme: &str, input: &str) -> Result<ParsedLink, DeepLinkError> {
    let url = Url::parse(input.trim()).map_err(|_| DeepLinkError::InvalidProtocol {
        expected: scheme.to_string(),
        found: input.trim().to_string(),
    })?;

    if !url.scheme().eq_ignore_ascii_case(scheme) || url.host_str() != Some(INSTALL_HOST) {
        return Err(DeepLinkError::InvalidProtocol {
            expected: scheme.to_string(),
            found: format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default()),
        });
    }

    let manifest_param =
        query_param(&url, MANIFEST_PARAM).ok_or(DeepLinkError::MissingManifest)?;

    let json = codec::decode(&manifest_param)?;
    let manifest = ManifestValidator::parse(&json)?;

    let signature_param = query_param(&url, SIGNATURE_PARAM);
    let github_username = match &signature_param {
        None => None,
        Some(_) => Some(
            manifest
                .github_username()
                .ok_or_else(|| DeepLinkError::UnsupportedAuthor {
                    found: manifest.manifest_author.clone(),
                })?
                .to_string(),
        ),
    };

    Ok(ParsedLink {
        manifest,
        payload: DeepLinkPayload {
            manifest_param,
            signature_param,
            github_username,
        },
    })
}

/// Build an install link around an already-encoded manifest parameter.
pub fn build_link(
    scheme: &str,
    manifest_param: &str,
    signature: Option<&str>,
) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&format!("{}://{}", scheme, INSTALL_HOST))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair(MANIFEST_PARAM, manifest_param);
        if let Some(signature) = signature {
            query.append_pair(SIGNATURE_PARAM, signature);
        }
    }
    Ok(url)
}

/// Serialize a manifest into its `manifest` parameter. Signers sign this string.
pub fn encode_manifest(manifest: &Manifest) -> Result<String, serde_json::Error> {
    Ok(codec::encode(&serde_json::to_string(manifest)?))
}

// Empty values count as absent
fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use magnet_manifest::ValidationError;

    fn manifest(author: Option<&str>) -> Manifest {
        let mut value = serde_json::json!({
            "name": "slack",
            "command": "npx",
            "args": ["-y", "pkg"],
            "manifestVersion": "1.0"
        });
        if let Some(author) = author {
            value["manifestAuthor"] = author.into();
        }
        ManifestValidator::from_value(value).unwrap()
    }

    fn link_for(manifest: &Manifest, signature: Option<&str>) -> String {
        let param = encode_manifest(manifest).unwrap();
        build_link(DEFAULT_SCHEME, &param, signature)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_round_trip_unsigned() {
        let original = manifest(None);
        let parsed = parse_link(DEFAULT_SCHEME, &link_for(&original, None)).unwrap();

        assert_eq!(parsed.manifest, original);
        assert_eq!(parsed.payload.signature_param, None);
        assert_eq!(parsed.payload.github_username, None);
    }

    #[test]
    fn test_foreign_scheme_or_host_is_rejected() {
        let param = encode_manifest(&manifest(None)).unwrap();
        for url in [
            format!("https://install?manifest={}", param),
            format!("mcp-magnet://update?manifest={}", param),
            format!("other://install?manifest={}", param),
            "not a url".to_string(),
        ] {
            assert!(
                matches!(
                    parse_link(DEFAULT_SCHEME, &url),
                    Err(DeepLinkError::InvalidProtocol { .. })
                ),
                "{url}"
            );
        }
    }

    #[test]
    fn test_missing_or_empty_manifest() {
        assert_eq!(
            parse_link(DEFAULT_SCHEME, "mcp-magnet://install"),
            Err(DeepLinkError::MissingManifest)
        );
        assert_eq!(
            parse_link(DEFAULT_SCHEME, "mcp-magnet://install?manifest="),
            Err(DeepLinkError::MissingManifest)
        );
    }

    #[test]
    fn test_undecodable_manifest() {
        assert!(matches!(
            parse_link(DEFAULT_SCHEME, "mcp-magnet://install?manifest=abcde"),
            Err(DeepLinkError::Decode(_))
        ));
    }

    #[test]
    fn test_invalid_manifest_reports_field() {
        let param = codec::encode(r#"{"name":"slack","args":[],"manifestVersion":"1"}"#);
        let err = parse_link(DEFAULT_SCHEME, &format!("mcp-magnet://install?manifest={}", param))
            .unwrap_err();

        match err {
            DeepLinkError::InvalidManifest(ValidationError::Field { field, .. }) => {
                assert_eq!(field, "command")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_signature_requires_github_author() {
        let url = link_for(&manifest(Some("Anthropic")), Some("sig"));
        assert_eq!(
            parse_link(DEFAULT_SCHEME, &url),
            Err(DeepLinkError::UnsupportedAuthor {
                found: Some("Anthropic".into())
            })
        );

        let url = link_for(&manifest(None), Some("sig"));
        assert_eq!(
            parse_link(DEFAULT_SCHEME, &url),
            Err(DeepLinkError::UnsupportedAuthor { found: None })
        );
    }

    #[test]
    fn test_signature_is_percent_decoded() {
        let armored = "-----BEGIN SSH SIGNATURE-----\nU1NIU0lH+/=\n-----END SSH SIGNATURE-----";
        let original = manifest(Some("github:alice"));
        let parsed = parse_link(DEFAULT_SCHEME, &link_for(&original, Some(armored))).unwrap();

        assert_eq!(parsed.payload.signature_param.as_deref(), Some(armored));
        assert_eq!(parsed.payload.github_username.as_deref(), Some("alice"));
        assert_eq!(
            parsed.payload.manifest_param,
            encode_manifest(&original).unwrap()
        );
    }

    #[test]
    fn test_custom_scheme() {
        let param = encode_manifest(&manifest(None)).unwrap();
        let url = build_link("magnet-dev", &param, None).unwrap();
        assert!(parse_link("magnet-dev", url.as_str()).is_ok());
        assert!(parse_link(DEFAULT_SCHEME, url.as_str()).is_err());
    }
}
