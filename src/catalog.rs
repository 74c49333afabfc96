//! Catalog data model and the two-stage browse response decoder.
//!
//! Browse responses are double-encoded: the SOAP `<Result>` element carries a
//! complete DIDL-Lite document as escaped text. The two stages are kept as
//! separate entry points ([`parse_browse_response`] and [`parse_didl`]) so
//! the envelope and content decoders can be tested independently.

use roxmltree::{Document, Node};

use crate::error::{Error, Result};

/// The two fixed top-level catalog identifiers the device exposes.
///
/// Which one answers depends on the mode selected on the camera: "send to
/// device" serves the push root, "choose on computer" serves the photo root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root {
    /// Staging area populated by the camera's "send to device" screen.
    Push,
    /// The full on-device media library.
    Photo,
}

impl Root {
    /// Catalog object id of this root.
    #[must_use]
    pub const fn object_id(self) -> &'static str {
        match self {
            Self::Push => "PushRoot",
            Self::Photo => "PhotoRoot",
        }
    }

    /// The root as a [`DirectoryRef`] for the traversal engine.
    #[must_use]
    pub fn directory(self) -> DirectoryRef {
        DirectoryRef {
            id: self.object_id().to_string(),
            title: Some(self.object_id().to_string()),
        }
    }
}

/// A sub-directory entry of the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRef {
    /// Opaque catalog-assigned object id, used for browsing.
    pub id: String,
    /// Display name, used as the local sub-path.
    pub title: Option<String>,
}

impl DirectoryRef {
    /// Display name, falling back to the object id when the device omitted
    /// the title.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

/// One advertised variant of an asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Download url. A descriptor without one is unusable.
    pub url: Option<String>,
    /// Advertised byte size, when the device reports one.
    pub size: Option<u64>,
    /// Pixel resolution tag, e.g. `1616x1080`.
    pub resolution: Option<String>,
    /// Free-text protocol/quality tag; may embed a marker like `_LRG`.
    pub protocol_info: Option<String>,
}

/// One media asset with its candidate resource variants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogItem {
    /// Display name, used as the local filename.
    pub title: Option<String>,
    /// Advertised variants, in declaration order.
    pub resources: Vec<ResourceDescriptor>,
}

/// One page of a directory's children, envelope stage only.
///
/// `result` still holds the encoded DIDL-Lite document and must go through
/// [`parse_didl`] as a second stage.
#[derive(Debug, Clone)]
pub struct BrowsePage {
    /// Number of children in this page.
    pub number_returned: u32,
    /// Total children of the directory across all pages.
    pub total_matches: u32,
    /// Offset this page was requested at.
    pub starting_index: u32,
    /// Inner DIDL-Lite document text.
    pub result: String,
}

impl BrowsePage {
    /// True when no further page needs to be fetched for this directory.
    #[must_use]
    pub const fn is_last(&self) -> bool {
        self.number_returned == 0
            || self.starting_index + self.number_returned >= self.total_matches
    }

    /// Starting index of the next page.
    #[must_use]
    pub const fn next_index(&self) -> u32 {
        self.starting_index + self.number_returned
    }
}

/// Decoded children of one browse page.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    /// Sub-directories, in device order.
    pub directories: Vec<DirectoryRef>,
    /// Items, in device order.
    pub items: Vec<CatalogItem>,
}

fn required_u32(doc: &Document<'_>, name: &'static str) -> Result<u32> {
    doc.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .and_then(collected_text)
        .and_then(|t| t.trim().parse().ok())
        .ok_or(Error::MissingElement(name))
}

/// Concatenates a node's direct text children. Escaped content may be split
/// across several text nodes after entity resolution.
fn collected_text(node: Node<'_, '_>) -> Option<String> {
    let text: String = node
        .children()
        .filter(Node::is_text)
        .filter_map(|c| c.text())
        .collect();
    if text.is_empty() { None } else { Some(text) }
}

fn child_element_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
        .and_then(collected_text)
}

/// Stage 1: decodes the SOAP Browse envelope.
///
/// `starting_index` is the offset the page was requested at; the device does
/// not echo it back.
///
/// # Errors
///
/// Fails if the envelope is not well-formed XML or lacks the
/// `NumberReturned`, `TotalMatches` or `Result` elements.
pub fn parse_browse_response(xml: &str, starting_index: u32) -> Result<BrowsePage> {
    let doc = Document::parse(xml)?;
    let number_returned = required_u32(&doc, "NumberReturned")?;
    let total_matches = required_u32(&doc, "TotalMatches")?;
    let result = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "Result")
        .and_then(collected_text)
        .ok_or(Error::MissingElement("Result"))?;
    Ok(BrowsePage {
        number_returned,
        total_matches,
        starting_index,
        result,
    })
}

fn decode_resource(res: Node<'_, '_>) -> ResourceDescriptor {
    ResourceDescriptor {
        url: collected_text(res),
        size: res.attribute("size").and_then(|s| s.trim().parse().ok()),
        resolution: res.attribute("resolution").map(str::to_string),
        protocol_info: res.attribute("protocolInfo").map(str::to_string),
    }
}

/// Stage 2: decodes the inner DIDL-Lite document into directories and items.
///
/// Missing or malformed ids, titles and urls become `None` (or skip the one
/// node that cannot be used at all); a bad node never aborts the page.
///
/// # Errors
///
/// Fails only if the document itself is not well-formed XML.
pub fn parse_didl(xml: &str) -> Result<PageContent> {
    let doc = Document::parse(xml)?;
    let mut content = PageContent::default();
    for node in doc.root_element().children().filter(Node::is_element) {
        match node.tag_name().name() {
            "container" => {
                let Some(id) = node.attribute("id") else {
                    log::warn!("skipping container without id attribute");
                    continue;
                };
                content.directories.push(DirectoryRef {
                    id: id.to_string(),
                    title: child_element_text(node, "title"),
                });
            }
            "item" => {
                content.items.push(CatalogItem {
                    title: child_element_text(node, "title"),
                    resources: node
                        .children()
                        .filter(|c| c.is_element() && c.tag_name().name() == "res")
                        .map(decode_resource)
                        .collect(),
                });
            }
            _ => {}
        }
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIDL_NS: &str = r#"xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/""#;

    fn browse_envelope(number_returned: u32, total_matches: u32, didl: &str) -> String {
        let escaped = didl
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;");
        format!(
            concat!(
                r#"<?xml version="1.0"?>"#,
                r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">"#,
                "<s:Body>",
                r#"<u:BrowseResponse xmlns:u="urn:schemas-upnp-org:service:ContentDirectory:1">"#,
                "<Result>{result}</Result>",
                "<NumberReturned>{returned}</NumberReturned>",
                "<TotalMatches>{total}</TotalMatches>",
                "<UpdateID>1</UpdateID>",
                "</u:BrowseResponse></s:Body></s:Envelope>"
            ),
            result = escaped,
            returned = number_returned,
            total = total_matches,
        )
    }

    #[test]
    fn envelope_stage_extracts_counters_and_result() {
        let didl = format!(r#"<DIDL-Lite {DIDL_NS}></DIDL-Lite>"#);
        let xml = browse_envelope(12, 40, &didl);
        let page = parse_browse_response(&xml, 12).unwrap();
        assert_eq!(page.number_returned, 12);
        assert_eq!(page.total_matches, 40);
        assert_eq!(page.starting_index, 12);
        assert_eq!(page.result, didl);
        assert!(!page.is_last());
        assert_eq!(page.next_index(), 24);
    }

    #[test]
    fn envelope_stage_rejects_missing_counters() {
        let xml = r#"<?xml version="1.0"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body></s:Body></s:Envelope>"#;
        let err = parse_browse_response(xml, 0).unwrap_err();
        assert!(matches!(err, Error::MissingElement("NumberReturned")));
    }

    #[test]
    fn last_page_detection() {
        let didl = format!(r#"<DIDL-Lite {DIDL_NS}></DIDL-Lite>"#);
        let final_page = parse_browse_response(&browse_envelope(10, 30, &didl), 20).unwrap();
        assert!(final_page.is_last());
        let empty_page = parse_browse_response(&browse_envelope(0, 30, &didl), 0).unwrap();
        assert!(empty_page.is_last());
    }

    #[test]
    fn didl_stage_decodes_containers_and_items() {
        let didl = format!(
            concat!(
                r#"<DIDL-Lite {ns}>"#,
                r#"<container id="05" parentID="03" restricted="1"><dc:title>10300103</dc:title></container>"#,
                r#"<item id="06_1" parentID="05" restricted="1">"#,
                "<dc:title>DSC00042.JPG</dc:title>",
                r#"<res protocolInfo="http-get:*:image/jpeg:DLNA.ORG_PN=JPEG_SM" resolution="640x480">http://cam/sm.jpg</res>"#,
                r#"<res protocolInfo="http-get:*:image/jpeg:*" size="4194304">http://cam/full.jpg</res>"#,
                "</item>",
                "</DIDL-Lite>"
            ),
            ns = DIDL_NS,
        );
        let content = parse_didl(&didl).unwrap();
        assert_eq!(content.directories.len(), 1);
        assert_eq!(content.directories[0].id, "05");
        assert_eq!(content.directories[0].display_name(), "10300103");
        assert_eq!(content.items.len(), 1);

        let item = &content.items[0];
        assert_eq!(item.title.as_deref(), Some("DSC00042.JPG"));
        assert_eq!(item.resources.len(), 2);
        assert_eq!(item.resources[0].url.as_deref(), Some("http://cam/sm.jpg"));
        assert_eq!(item.resources[0].size, None);
        assert_eq!(item.resources[0].resolution.as_deref(), Some("640x480"));
        assert_eq!(item.resources[1].size, Some(4_194_304));
        assert_eq!(item.resources[1].url.as_deref(), Some("http://cam/full.jpg"));
    }

    #[test]
    fn didl_stage_tolerates_missing_fields() {
        let didl = format!(
            concat!(
                r#"<DIDL-Lite {ns}>"#,
                // no id: unusable, dropped with a warning
                r#"<container restricted="1"><dc:title>orphan</dc:title></container>"#,
                // no title: falls back to the id
                r#"<container id="07"></container>"#,
                // item with a malformed size and an empty res
                r#"<item id="08_1"><res size="many">http://cam/a.jpg</res><res size="9"></res></item>"#,
                "</DIDL-Lite>"
            ),
            ns = DIDL_NS,
        );
        let content = parse_didl(&didl).unwrap();
        assert_eq!(content.directories.len(), 1);
        assert_eq!(content.directories[0].display_name(), "07");

        let item = &content.items[0];
        assert_eq!(item.title, None);
        assert_eq!(item.resources[0].size, None);
        assert_eq!(item.resources[0].url.as_deref(), Some("http://cam/a.jpg"));
        assert_eq!(item.resources[1].url, None);
        assert_eq!(item.resources[1].size, Some(9));
    }

    #[test]
    fn both_stages_round_trip_the_double_encoding() {
        let didl = format!(
            r#"<DIDL-Lite {DIDL_NS}><item id="1"><dc:title>A&amp;B.JPG</dc:title><res>http://cam/1</res></item></DIDL-Lite>"#,
        );
        let xml = browse_envelope(1, 1, &didl);
        let page = parse_browse_response(&xml, 0).unwrap();
        let content = parse_didl(&page.result).unwrap();
        assert_eq!(content.items[0].title.as_deref(), Some("A&B.JPG"));
        assert!(page.is_last());
    }
}
