//! BCF 2.1 bundle of failed checks.
//!
//! One topic per failed entity, each with a markup and a viewpoint that
//! selects the entity by its global id.

use crate::error::ExportError;
use crate::validation::Reporter;
use chrono::{SecondsFormat, Utc};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Entry names inside the bundle; markup and viewpoint sit in one folder
/// per topic.
const VERSION_ENTRY: &str = "bcf.version";
const MARKUP_ENTRY: &str = "markup.bcf";
const VIEWPOINT_ENTRY: &str = "viewpoint.bcfv";

/// Content of [`VERSION_ENTRY`].
const VERSION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Version VersionId="2.1">
  <DetailedVersion>2.1</DetailedVersion>
</Version>
"#;

/// `CreationAuthor` of every topic.
const AUTHOR: &str = env!("CARGO_PKG_NAME");

/// Writes the failed entities of a report as a zipped BCF bundle.
pub fn export_report<P: AsRef<Path>>(reporter: &Reporter, path: P) -> Result<(), ExportError> {
    let path_ref = path.as_ref();
    let file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;

    write_bundle(reporter, file)?;
    Ok(())
}

/// Writes the bundle to any seekable writer and returns the topic count.
pub fn write_bundle<W: Write + std::io::Seek>(reporter: &Reporter, writer: W) -> Result<usize, ExportError> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    zip.start_file(VERSION_ENTRY, options)?;
    write_all(&mut zip, VERSION)?;

    let mut topics = 0;
    for (spec, req, entity, failed) in reporter.entity_results() {
        if !failed {
            continue;
        }
        let topic = Uuid::new_v4().to_string();
        let viewpoint = Uuid::new_v4().to_string();
        let title = format!("{}: {}", spec.name, entity.element);
        let mut description = req.description.clone();
        if let Some(reason) = &entity.reason {
            description.push_str(" - ");
            description.push_str(reason);
        }
        if let Some(filename) = &reporter.filename {
            description.push_str(&format!(" ({filename})"));
        }

        let markup = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Markup>
  <Topic Guid="{topic}" TopicType="Issue" TopicStatus="Open">
    <Title>{}</Title>
    <CreationDate>{now}</CreationDate>
    <CreationAuthor>{AUTHOR}</CreationAuthor>
    <Description>{}</Description>
  </Topic>
  <Viewpoints Guid="{viewpoint}">
    <Viewpoint>{VIEWPOINT_ENTRY}</Viewpoint>
  </Viewpoints>
</Markup>
"#,
            escape(&title),
            escape(&description),
        );
        zip.start_file(format!("{topic}/{MARKUP_ENTRY}"), options)?;
        write_all(&mut zip, &markup)?;

        let component = entity
            .element
            .global_id
            .as_deref()
            .map(|guid| format!(r#"      <Component IfcGuid="{}"/>"#, escape(guid)))
            .unwrap_or_default();
        let visualization = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<VisualizationInfo Guid="{viewpoint}">
  <Components>
    <Selection>
{component}
    </Selection>
  </Components>
</VisualizationInfo>
"#
        );
        zip.start_file(format!("{topic}/{VIEWPOINT_ENTRY}"), options)?;
        write_all(&mut zip, &visualization)?;

        topics += 1;
    }

    zip.finish()?;
    Ok(topics)
}

fn write_all<W: Write>(writer: &mut W, text: &str) -> Result<(), ExportError> {
    writer
        .write_all(text.as_bytes())
        .map_err(|e| ExportError::WriteError {
            message: e.to_string(),
        })
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ElementRef;
    use crate::validation::{RequirementResult, SpecificationResult};
    use std::io::{Cursor, Read};

    #[test]
    fn writes_one_topic_per_failure() {
        let element = ElementRef {
            filename: "a.ifc".to_string(),
            id: 55,
            class: "IfcWall".to_string(),
            global_id: Some("G1".to_string()),
            name: Some("Wall <1>".to_string()),
        };
        let mut spec = SpecificationResult::new("Fire rating", "");
        spec.requirements.push(RequirementResult::new("FireRating shall be provided"));
        spec.record_fail(0, element.clone(), "missing".to_string());
        spec.record_pass(0, element);
        let reporter = Reporter {
            title: "Walls".to_string(),
            filename: Some("a.ifc".to_string()),
            specifications: vec![spec],
        };

        let mut buffer = Cursor::new(Vec::new());
        assert_eq!(write_bundle(&reporter, &mut buffer).unwrap(), 1);

        let mut archive = zip::ZipArchive::new(Cursor::new(buffer.into_inner())).unwrap();
        assert_eq!(archive.len(), 3);
        let markup_name = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .find(|n| n.ends_with("markup.bcf"))
            .unwrap();
        let mut markup = String::new();
        archive
            .by_name(&markup_name)
            .unwrap()
            .read_to_string(&mut markup)
            .unwrap();
        assert!(markup.contains("Wall &lt;1&gt;"));
        assert!(markup.contains("missing"));
        assert!(markup.contains("<CreationAuthor>ifc-workbench</CreationAuthor>"));
        assert!(markup.contains("<Viewpoint>viewpoint.bcfv</Viewpoint>"));
    }
}
