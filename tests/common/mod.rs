//! STEP fixtures written to temporary directories.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const PROJECT: &str = "0PROJECT0000000000000P";

#[derive(Debug, Clone)]
pub struct ElementSpec {
    pub id: u64,
    pub class: String,
    pub guid: String,
    pub name: String,
    pub tag: Option<String>,
    pub object_type: Option<String>,
    pub properties: Vec<(String, String, String)>,
    /// Left out of the spatial containment.
    pub orphan: bool,
}

/// A small IFC4 file: project, site, building and one storey holding the
/// elements.
#[derive(Debug, Clone)]
pub struct IfcFixture {
    project: String,
    elements: Vec<ElementSpec>,
}

impl IfcFixture {
    pub fn new() -> Self {
        Self::for_project(PROJECT)
    }

    pub fn for_project(project: &str) -> Self {
        Self {
            project: project.to_string(),
            elements: Vec::new(),
        }
    }

    pub fn element(mut self, id: u64, class: &str, guid: &str, name: &str) -> Self {
        self.elements.push(ElementSpec {
            id,
            class: class.to_string(),
            guid: guid.to_string(),
            name: name.to_string(),
            tag: None,
            object_type: None,
            properties: Vec::new(),
            orphan: false,
        });
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        if let Some(last) = self.elements.last_mut() {
            last.tag = Some(tag.to_string());
        }
        self
    }

    pub fn object_type(mut self, object_type: &str) -> Self {
        if let Some(last) = self.elements.last_mut() {
            last.object_type = Some(object_type.to_string());
        }
        self
    }

    pub fn property(mut self, set: &str, name: &str, value: &str) -> Self {
        if let Some(last) = self.elements.last_mut() {
            last.properties
                .push((set.to_string(), name.to_string(), value.to_string()));
        }
        self
    }

    pub fn orphan(mut self) -> Self {
        if let Some(last) = self.elements.last_mut() {
            last.orphan = true;
        }
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::from(
            "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC4'));\nENDSEC;\nDATA;\n",
        );
        let _ = writeln!(out, "#1=IFCPROJECT('{}',$,'Project',$,$,$,$,$,$);", self.project);
        out.push_str("#2=IFCSITE('0SITE0000000000000000S',$,'Site',$,$,$,$,$,.ELEMENT.,$,$,$,$,$);\n");
        out.push_str("#3=IFCBUILDING('0BUILDING000000000000B',$,'Building',$,$,$,$,$,.ELEMENT.,$,$,$);\n");
        out.push_str("#4=IFCBUILDINGSTOREY('0STOREY00000000000000L',$,'Level 1',$,$,$,$,$,.ELEMENT.,0.);\n");
        out.push_str("#5=IFCRELAGGREGATES('0REL00000000000000005',$,$,$,#1,(#2));\n");
        out.push_str("#6=IFCRELAGGREGATES('0REL00000000000000006',$,$,$,#2,(#3));\n");
        out.push_str("#7=IFCRELAGGREGATES('0REL00000000000000007',$,$,$,#3,(#4));\n");

        for element in &self.elements {
            let _ = writeln!(
                out,
                "#{}={}('{}',$,'{}',$,{},$,$,{},$);",
                element.id,
                element.class.to_uppercase(),
                element.guid,
                element.name,
                quoted(element.object_type.as_deref()),
                quoted(element.tag.as_deref()),
            );
        }

        let contained: Vec<String> = self
            .elements
            .iter()
            .filter(|e| !e.orphan)
            .map(|e| format!("#{}", e.id))
            .collect();
        if !contained.is_empty() {
            let _ = writeln!(
                out,
                "#900=IFCRELCONTAINEDINSPATIALSTRUCTURE('0REL000000000000000900',$,$,$,({}),#4);",
                contained.join(",")
            );
        }

        // One set entity per element and set name
        let mut next = 1000;
        for element in &self.elements {
            let mut sets: Vec<&str> = element.properties.iter().map(|(s, _, _)| s.as_str()).collect();
            sets.dedup();
            for set in sets {
                let mut members = Vec::new();
                for (_, name, value) in element.properties.iter().filter(|(s, _, _)| s == set) {
                    let _ = writeln!(
                        out,
                        "#{next}=IFCPROPERTYSINGLEVALUE('{name}',$,IFCLABEL('{value}'),$);"
                    );
                    members.push(format!("#{next}"));
                    next += 1;
                }
                let set_id = next;
                let _ = writeln!(
                    out,
                    "#{set_id}=IFCPROPERTYSET('0PSET{set_id:0>17}',$,'{set}',$,({}));",
                    members.join(",")
                );
                let _ = writeln!(
                    out,
                    "#{}=IFCRELDEFINESBYPROPERTIES('0REL{:0>18}',$,$,$,(#{}),#{set_id});",
                    set_id + 1,
                    set_id + 1,
                    element.id
                );
                next += 2;
            }
        }

        out.push_str("ENDSEC;\nEND-ISO-10303-21;\n");
        out
    }

    /// Writes the file into `dir` and returns its path.
    pub fn write(&self, dir: &Path, filename: &str) -> PathBuf {
        let path = dir.join(filename);
        fs::write(&path, self.render()).unwrap();
        path
    }
}

fn quoted(value: Option<&str>) -> String {
    value.map_or_else(|| "$".to_string(), |v| format!("'{v}'"))
}

/// An IDS document with one specification requiring a property on walls.
pub fn wall_property_ids(set: &str, property: &str, values: &[&str]) -> String {
    property_ids("IFCWALL", "IFC4", set, property, values)
}

/// An IDS document with one specification requiring a property on
/// `entity` in models of schema `ifc_version`.
pub fn property_ids(
    entity: &str,
    ifc_version: &str,
    set: &str,
    property: &str,
    values: &[&str],
) -> String {
    let enumeration: String = values
        .iter()
        .map(|v| format!("<xs:enumeration value=\"{v}\"/>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ids:ids xmlns:ids="http://standards.buildingsmart.org/IDS" xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <ids:info><ids:title>Wall rules</ids:title></ids:info>
  <ids:specifications>
    <ids:specification name="Wall property" ifcVersion="{ifc_version}">
      <ids:applicability>
        <ids:entity><ids:name><ids:simpleValue>{entity}</ids:simpleValue></ids:name></ids:entity>
      </ids:applicability>
      <ids:requirements>
        <ids:property>
          <ids:propertySet><ids:simpleValue>{set}</ids:simpleValue></ids:propertySet>
          <ids:baseName><ids:simpleValue>{property}</ids:simpleValue></ids:baseName>
          <ids:value><xs:restriction base="xs:string">{enumeration}</xs:restriction></ids:value>
        </ids:property>
      </ids:requirements>
    </ids:specification>
  </ids:specifications>
</ids:ids>"#
    )
}
