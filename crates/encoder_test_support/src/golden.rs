use crate::Fixture;
use encoder::{DocumentEncoder, EncoderFlags, Encoder, HtmlCopyEncoder};
use dom::Selection;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

pub const GOLDEN_FORMAT_V1: &str = "encoder-golden-v1";

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
struct GoldenManifest {
    format: String,
    cases: Vec<GoldenCase>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GoldenStatus {
    #[default]
    Active,
    Xfail,
    Skip,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GoldenMode {
    /// The whole document.
    #[default]
    Document,
    /// The element named by `node`, markers included.
    Node,
    /// The children of the element named by `node`.
    Container,
    /// The fixture range through the plain encoder.
    Range,
    /// The fixture range, flagged to cross shadow boundaries.
    FlatRange,
    /// The fixture range as a one-range selection through the copy encoder.
    Copy,
    /// Like `copy`, also checking the paste context.
    CopyContext,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GoldenDocument {
    #[default]
    Html,
    Xml,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GoldenCase {
    pub id: String,
    pub markup: String,
    #[serde(default)]
    pub document: GoldenDocument,
    pub mime: String,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub mode: GoldenMode,
    pub node: Option<String>,
    pub max_length: Option<u32>,
    pub wrap_column: Option<u32>,
    pub expected: String,
    pub expected_context: Option<String>,
    pub expected_info: Option<String>,
    #[serde(default)]
    pub status: GoldenStatus,
    pub reason: Option<String>,
}

/// What a case produced; `context`/`info` are only set in `copy-context` mode.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GoldenOutput {
    pub encoded: String,
    pub context: Option<String>,
    pub info: Option<String>,
}

pub fn load_golden_manifest(path: &Path) -> Vec<GoldenCase> {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read golden manifest {path:?}: {err}"));
    let manifest: GoldenManifest = toml::from_str(&content)
        .unwrap_or_else(|err| panic!("failed to parse golden manifest {path:?}: {err}"));
    assert_eq!(
        manifest.format, GOLDEN_FORMAT_V1,
        "unsupported golden manifest format in {path:?}"
    );

    let mut seen = BTreeSet::new();
    for case in &manifest.cases {
        if !seen.insert(case.id.as_str()) {
            panic!("duplicate case id '{}' in {path:?}", case.id);
        }
        match case.status {
            GoldenStatus::Active => assert!(
                case.reason.is_none(),
                "case '{}' has reason but is not xfail/skip in {path:?}",
                case.id
            ),
            GoldenStatus::Xfail | GoldenStatus::Skip => assert!(
                !case.reason.as_deref().unwrap_or("").is_empty(),
                "case '{}' with status '{:?}' missing reason in {path:?}",
                case.id,
                case.status
            ),
        }
        let needs_node = matches!(case.mode, GoldenMode::Node | GoldenMode::Container);
        assert_eq!(
            needs_node,
            case.node.is_some(),
            "case '{}': `node` is required exactly for node/container modes in {path:?}",
            case.id
        );
        let has_context = case.expected_context.is_some() || case.expected_info.is_some();
        if has_context && case.mode != GoldenMode::CopyContext {
            panic!(
                "case '{}': expected_context/expected_info need mode copy-context in {path:?}",
                case.id
            );
        }
    }
    manifest.cases
}

/// Build the fixture for `case` and run the encoder it asks for.
pub fn run_golden_case(case: &GoldenCase) -> Result<GoldenOutput, String> {
    let fixture = match case.document {
        GoldenDocument::Html => Fixture::parse(&case.markup),
        GoldenDocument::Xml => Fixture::parse_xml(&case.markup),
    };
    let flags = EncoderFlags::from_names(case.flags.iter().map(String::as_str))?;
    let max_length = case.max_length.unwrap_or(0);

    match case.mode {
        GoldenMode::Copy | GoldenMode::CopyContext => {
            let mut encoder = HtmlCopyEncoder::new();
            encoder
                .init(&fixture.doc, &case.mime, flags)
                .map_err(|err| format!("init: {err}"))?;
            if let Some(column) = case.wrap_column {
                encoder.set_wrap_column(column);
            }
            let range = if flags.contains(EncoderFlags::ALLOW_CROSS_SHADOW_BOUNDARY) {
                fixture.flat_range()
            } else {
                fixture.range()
            };
            encoder
                .set_selection(Selection::from(range))
                .map_err(|err| format!("set_selection: {err}"))?;
            if case.mode == GoldenMode::Copy {
                let encoded = encoder
                    .encode_to_string_with_max_length(max_length)
                    .map_err(|err| format!("encode: {err}"))?;
                return Ok(GoldenOutput {
                    encoded,
                    ..GoldenOutput::default()
                });
            }
            let out = encoder
                .encode_to_string_with_context()
                .map_err(|err| format!("encode with context: {err}"))?;
            Ok(GoldenOutput {
                encoded: out.encoded,
                context: Some(out.context),
                info: Some(out.info),
            })
        }
        mode => {
            let mut encoder = DocumentEncoder::new();
            encoder
                .init(&fixture.doc, &case.mime, flags)
                .map_err(|err| format!("init: {err}"))?;
            if let Some(column) = case.wrap_column {
                encoder.set_wrap_column(column);
            }
            let node = || fixture.element_by_id(case.node.as_deref().unwrap_or_default());
            match mode {
                GoldenMode::Node => encoder.set_node(node()),
                GoldenMode::Container => encoder.set_container_node(node()),
                GoldenMode::Range => encoder.set_range(fixture.range()),
                GoldenMode::FlatRange => encoder.set_range(fixture.flat_range()),
                _ => {}
            }
            let encoded = encoder
                .encode_to_string_with_max_length(max_length)
                .map_err(|err| format!("encode: {err}"))?;
            Ok(GoldenOutput {
                encoded,
                ..GoldenOutput::default()
            })
        }
    }
}

/// Compare a case's output with its expectations.
pub fn check_golden_case(case: &GoldenCase, output: &GoldenOutput) -> Result<(), String> {
    if output.encoded != case.expected {
        let expected = crate::output_lines(&case.expected);
        let actual = crate::output_lines(&output.encoded);
        return Err(format!(
            "case '{}' output mismatch\n{}",
            case.id,
            crate::diff_lines(&expected, &actual)
        ));
    }
    if let Some(expected) = &case.expected_context
        && output.context.as_ref() != Some(expected)
    {
        return Err(format!(
            "case '{}' context mismatch: expected '{}', actual '{}'",
            case.id,
            crate::escape_text(expected),
            crate::escape_text(output.context.as_deref().unwrap_or(""))
        ));
    }
    if let Some(expected) = &case.expected_info
        && output.info.as_ref() != Some(expected)
    {
        return Err(format!(
            "case '{}' context info mismatch: expected '{expected}', actual '{}'",
            case.id,
            output.info.as_deref().unwrap_or("")
        ));
    }
    Ok(())
}
