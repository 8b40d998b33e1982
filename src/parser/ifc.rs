use crate::error::ParseError;
use crate::parser::schema;
use crate::parser::step::{StepEntity, StepFile, StepValue};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

/// Set name -> member name -> formatted value.
pub type PropertySets = BTreeMap<String, BTreeMap<String, String>>;

/// Set name -> member names in first-seen order.
pub type SetIndex = BTreeMap<String, Vec<String>>;

/// The two namespaces of named value bags attached to objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SetKind {
    Property,
    Quantity,
}

/// A parsed IFC document with the relation indexes the trees need.
///
/// Parses an IFC file in STEP format. Supports both IFC2x3 and IFC4 schemas.
/// Extracts:
/// - The project and its global id
/// - Spatial decomposition and containment
/// - Type and property set relationships
/// - Property and quantity set names across the file
#[derive(Debug)]
pub struct IfcModel {
    step: StepFile,
    project_id: u64,
    project_guid: String,
    guid_index: HashMap<String, u64>,
    decomposed_by: HashMap<u64, Vec<u64>>,
    decomposes: HashMap<u64, u64>,
    contains: HashMap<u64, Vec<u64>>,
    contained_in: HashMap<u64, u64>,
    type_of: HashMap<u64, u64>,
    definitions: HashMap<u64, Vec<u64>>,
    element_ids: Vec<u64>,
    type_ids: Vec<u64>,
    spatial_ids: Vec<u64>,
}

impl IfcModel {
    /// Reads and parses an IFC file.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::FileRead`] if the file cannot be read.
    /// Returns [`ParseError::InvalidStep`] if the STEP format is malformed
    /// or the file has no `IfcProject`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ifc_workbench::parser::IfcModel;
    ///
    /// let model = IfcModel::open("model.ifc")?;
    /// println!("{} elements", model.elements().len());
    /// # Ok::<(), ifc_workbench::error::ParseError>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        let content = std::fs::read_to_string(&path).map_err(|source| ParseError::FileRead {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let step = StepFile::parse(content)?;

        let (project_id, project_guid) = step
            .get_entities_by_type("IFCPROJECT")
            .first()
            .and_then(|p| p.string_at(0).map(|guid| (p.id, guid.to_string())))
            .ok_or_else(|| ParseError::InvalidStep {
                message: "no IfcProject with a GlobalId".to_string(),
            })?;

        let mut model = IfcModel {
            step,
            project_id,
            project_guid,
            guid_index: HashMap::new(),
            decomposed_by: HashMap::new(),
            decomposes: HashMap::new(),
            contains: HashMap::new(),
            contained_in: HashMap::new(),
            type_of: HashMap::new(),
            definitions: HashMap::new(),
            element_ids: Vec::new(),
            type_ids: Vec::new(),
            spatial_ids: Vec::new(),
        };

        model.extract_relations();
        model.classify_entities();
        model.index_global_ids();

        Ok(model)
    }

    fn extract_relations(&mut self) {
        // Index 4 = relating object, index 5 = related objects
        for rel_type in ["IFCRELAGGREGATES", "IFCRELNESTS"] {
            for rel in self.step.get_entities_by_type(rel_type) {
                let Some(parent) = rel.reference_at(4) else {
                    continue;
                };
                for child in rel.references_at(5) {
                    self.decomposed_by.entry(parent).or_default().push(child);
                    self.decomposes.entry(child).or_insert(parent);
                }
            }
        }

        // Index 4 = RelatedElements, index 5 = RelatingStructure
        for rel in self
            .step
            .get_entities_by_type("IFCRELCONTAINEDINSPATIALSTRUCTURE")
        {
            let Some(structure) = rel.reference_at(5) else {
                continue;
            };
            for element in rel.references_at(4) {
                self.contains.entry(structure).or_default().push(element);
                self.contained_in.entry(element).or_insert(structure);
            }
        }

        // Index 4 = RelatedObjects, index 5 = RelatingType
        for rel in self.step.get_entities_by_type("IFCRELDEFINESBYTYPE") {
            if let Some(type_id) = rel.reference_at(5) {
                for object in rel.references_at(4) {
                    self.type_of.insert(object, type_id);
                }
            }
        }

        // Index 4 = RelatedObjects, index 5 = RelatingPropertyDefinition
        for rel in self.step.get_entities_by_type("IFCRELDEFINESBYPROPERTIES") {
            if let Some(definition) = rel.reference_at(5) {
                for object in rel.references_at(4) {
                    self.definitions.entry(object).or_default().push(definition);
                }
            }
        }
    }

    fn classify_entities(&mut self) {
        let mut elements = BTreeSet::new();
        let mut types = BTreeSet::new();
        let mut spatial = BTreeSet::new();

        for entity in self.step.entities.values() {
            if schema::is_spatial_class(&entity.entity_type) {
                spatial.insert(entity.id);
            } else if schema::is_element_class(&entity.entity_type) {
                elements.insert(entity.id);
            } else if schema::is_type_class(&entity.entity_type) && entity.string_at(0).is_some() {
                types.insert(entity.id);
            }
        }

        // Anything contained in a spatial structure is an element, even if
        // its class is unknown here.
        for &element in self.contained_in.keys() {
            if !spatial.contains(&element) && self.step.get_entity(element).is_some() {
                elements.insert(element);
            }
        }

        self.element_ids = elements.into_iter().collect();
        self.type_ids = types.into_iter().collect();
        self.spatial_ids = spatial.into_iter().collect();
    }

    fn index_global_ids(&mut self) {
        let rooted = std::iter::once(self.project_id)
            .chain(self.spatial_ids.iter().copied())
            .chain(self.element_ids.iter().copied())
            .chain(self.type_ids.iter().copied());

        for id in rooted {
            if let Some(guid) = self.step.get_entity(id).and_then(|e| e.string_at(0)) {
                self.guid_index.entry(guid.to_string()).or_insert(id);
            }
        }
    }

    #[must_use]
    pub fn schema(&self) -> &str {
        &self.step.schema
    }

    #[must_use]
    pub fn project(&self) -> Option<Entity<'_>> {
        self.by_id(self.project_id)
    }

    #[must_use]
    pub fn project_guid(&self) -> &str {
        &self.project_guid
    }

    #[must_use]
    pub fn by_id(&self, id: u64) -> Option<Entity<'_>> {
        self.step
            .get_entity(id)
            .map(|raw| Entity { model: self, raw })
    }

    #[must_use]
    pub fn by_guid(&self, guid: &str) -> Option<Entity<'_>> {
        self.guid_index.get(guid).and_then(|id| self.by_id(*id))
    }

    /// Entities of a class. `IfcElement`, `IfcElementType` / `IfcTypeObject`
    /// and `IfcSpatialStructureElement` select the whole family, any other
    /// name selects exactly that class.
    #[must_use]
    pub fn by_type(&self, class: &str) -> Vec<Entity<'_>> {
        let upper = class.to_ascii_uppercase();
        match upper.as_str() {
            "IFCELEMENT" | "IFCPRODUCT" => self.elements(),
            "IFCELEMENTTYPE" | "IFCTYPEOBJECT" | "IFCTYPEPRODUCT" => self.element_types(),
            "IFCSPATIALSTRUCTUREELEMENT" | "IFCSPATIALELEMENT" => self.ids_to_entities(&self.spatial_ids),
            _ => self
                .step
                .get_entities_by_type(&upper)
                .into_iter()
                .map(|raw| Entity { model: self, raw })
                .collect(),
        }
    }

    #[must_use]
    pub fn elements(&self) -> Vec<Entity<'_>> {
        self.ids_to_entities(&self.element_ids)
    }

    #[must_use]
    pub fn element_types(&self) -> Vec<Entity<'_>> {
        self.ids_to_entities(&self.type_ids)
    }

    /// Project, spatial structure, elements and element types.
    #[must_use]
    pub fn objects(&self) -> Vec<Entity<'_>> {
        let mut ids: Vec<u64> = std::iter::once(self.project_id)
            .chain(self.spatial_ids.iter().copied())
            .chain(self.element_ids.iter().copied())
            .chain(self.type_ids.iter().copied())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        self.ids_to_entities(&ids)
    }

    fn ids_to_entities(&self, ids: &[u64]) -> Vec<Entity<'_>> {
        ids.iter().filter_map(|id| self.by_id(*id)).collect()
    }

    /// Property set names with their property names.
    #[must_use]
    pub fn pset_info(&self) -> SetIndex {
        self.set_info(SetKind::Property)
    }

    /// Quantity set names with their quantity names.
    #[must_use]
    pub fn qset_info(&self) -> SetIndex {
        self.set_info(SetKind::Quantity)
    }

    fn set_info(&self, kind: SetKind) -> SetIndex {
        let step_type = match kind {
            SetKind::Property => "IFCPROPERTYSET",
            SetKind::Quantity => "IFCELEMENTQUANTITY",
        };
        let mut info = SetIndex::new();
        for set in self.step.get_entities_by_type(step_type) {
            if let Some((_, name, members)) = self.read_definition(set.id) {
                let names = info.entry(name).or_default();
                for member in members.into_keys() {
                    if !names.contains(&member) {
                        names.push(member);
                    }
                }
            }
        }
        info
    }

    fn read_definition(&self, id: u64) -> Option<(SetKind, String, BTreeMap<String, String>)> {
        let definition = self.step.get_entity(id)?;
        let name = definition.string_at(2)?.to_string();
        let mut members = BTreeMap::new();

        match definition.entity_type.as_str() {
            "IFCPROPERTYSET" => {
                for prop in definition
                    .references_at(4)
                    .into_iter()
                    .filter_map(|p| self.step.get_entity(p))
                {
                    let Some(prop_name) = prop.string_at(0) else {
                        continue;
                    };
                    let value = match prop.entity_type.as_str() {
                        "IFCPROPERTYSINGLEVALUE" | "IFCPROPERTYENUMERATEDVALUE" => {
                            prop.values.get(2).map(format_step_value)
                        }
                        _ => None,
                    };
                    if let Some(value) = value {
                        members.insert(prop_name.to_string(), value);
                    }
                }
                Some((SetKind::Property, name, members))
            }
            "IFCELEMENTQUANTITY" => {
                for quantity in definition
                    .references_at(5)
                    .into_iter()
                    .filter_map(|q| self.step.get_entity(q))
                {
                    // Index 0 = Name, index 3 = the measure value
                    if let (Some(q_name), Some(value)) =
                        (quantity.string_at(0), quantity.values.get(3))
                    {
                        members.insert(q_name.to_string(), format_step_value(value));
                    }
                }
                Some((SetKind::Quantity, name, members))
            }
            _ => None,
        }
    }
}

/// A borrowed view on one entity of an [`IfcModel`].
#[derive(Debug, Clone, Copy)]
pub struct Entity<'a> {
    model: &'a IfcModel,
    raw: &'a StepEntity,
}

impl<'a> Entity<'a> {
    #[must_use]
    pub fn id(&self) -> u64 {
        self.raw.id
    }

    /// Upper case STEP type, e.g. `IFCWALL`.
    #[must_use]
    pub fn step_type(&self) -> &'a str {
        &self.raw.entity_type
    }

    /// Class name in its usual casing, e.g. `IfcWall`.
    #[must_use]
    pub fn class(&self) -> String {
        schema::class_name(&self.raw.entity_type)
    }

    #[must_use]
    pub fn is_element(&self) -> bool {
        self.model.element_ids.binary_search(&self.raw.id).is_ok()
    }

    #[must_use]
    pub fn is_type(&self) -> bool {
        self.model.type_ids.binary_search(&self.raw.id).is_ok()
    }

    #[must_use]
    pub fn is_spatial(&self) -> bool {
        self.model.spatial_ids.binary_search(&self.raw.id).is_ok()
    }

    #[must_use]
    pub fn global_id(&self) -> Option<&'a str> {
        self.raw.string_at(0)
    }

    #[must_use]
    pub fn name(&self) -> Option<&'a str> {
        self.raw.string_at(2)
    }

    #[must_use]
    pub fn description(&self) -> Option<&'a str> {
        self.raw.string_at(3)
    }

    /// `ObjectType` for occurrences, `ElementType` for type objects.
    #[must_use]
    pub fn object_type(&self) -> Option<&'a str> {
        if self.is_type() {
            self.raw.string_at(8)
        } else {
            self.raw.string_at(4)
        }
    }

    #[must_use]
    pub fn tag(&self) -> Option<&'a str> {
        if self.is_element() || self.is_type() {
            self.raw.string_at(7)
        } else {
            None
        }
    }

    /// Immediate spatial container: the containing structure for elements,
    /// the decomposed parent for spatial structure elements.
    #[must_use]
    pub fn container(&self) -> Option<Entity<'a>> {
        let parent = self
            .model
            .contained_in
            .get(&self.raw.id)
            .or_else(|| self.model.decomposes.get(&self.raw.id))?;
        self.model.by_id(*parent)
    }

    /// Objects this one is decomposed into.
    #[must_use]
    pub fn children(&self) -> Vec<Entity<'a>> {
        self.model
            .decomposed_by
            .get(&self.raw.id)
            .map(|ids| self.model.ids_to_entities(ids))
            .unwrap_or_default()
    }

    /// Elements contained in this spatial structure element.
    #[must_use]
    pub fn contained_elements(&self) -> Vec<Entity<'a>> {
        self.model
            .contains
            .get(&self.raw.id)
            .map(|ids| self.model.ids_to_entities(ids))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn element_type(&self) -> Option<Entity<'a>> {
        self.model
            .type_of
            .get(&self.raw.id)
            .and_then(|id| self.model.by_id(*id))
    }

    /// Named non-relational attributes with a value.
    ///
    /// References to other entities are left out since their numeric ids
    /// differ between files.
    #[must_use]
    pub fn attributes(&self) -> BTreeMap<String, String> {
        let names = schema::attribute_names(&self.raw.entity_type);
        self.raw
            .values
            .iter()
            .enumerate()
            .filter(|(_, value)| !value.is_null() && !value.is_relational())
            .map(|(i, value)| {
                let name = names
                    .get(i)
                    .map_or_else(|| format!("Attribute{i}"), |n| (*n).to_string());
                (name, format_step_value(value))
            })
            .collect()
    }

    /// A named attribute, matched case-insensitively.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attributes()
            .into_iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Property and quantity sets, including those inherited from the type.
    #[must_use]
    pub fn property_sets(&self) -> PropertySets {
        self.sets(None)
    }

    #[must_use]
    pub fn sets_of_kind(&self, kind: SetKind) -> PropertySets {
        self.sets(Some(kind))
    }

    #[must_use]
    pub fn property(&self, kind: SetKind, set: &str, member: &str) -> Option<String> {
        self.sets(Some(kind))
            .get(set)
            .and_then(|members| members.get(member))
            .cloned()
    }

    fn sets(&self, kind: Option<SetKind>) -> PropertySets {
        let mut sets = PropertySets::new();

        // Type sets first, occurrence values win
        if let Some(element_type) = self.element_type() {
            element_type.collect_own_sets(kind, &mut sets);
        }
        self.collect_own_sets(kind, &mut sets);

        sets
    }

    fn collect_own_sets(&self, kind: Option<SetKind>, sets: &mut PropertySets) {
        let mut definition_ids = self
            .model
            .definitions
            .get(&self.raw.id)
            .cloned()
            .unwrap_or_default();
        if self.is_type() {
            // Index 5 = HasPropertySets
            definition_ids.extend(self.raw.references_at(5));
        }

        for id in definition_ids {
            if let Some((set_kind, name, members)) = self.model.read_definition(id) {
                if kind.is_none_or(|k| k == set_kind) {
                    sets.entry(name).or_default().extend(members);
                }
            }
        }
    }
}

impl fmt::Display for Entity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}={}", self.raw.id, self.class())?;
        if let Some(name) = self.name() {
            write!(f, " '{name}'")?;
        }
        Ok(())
    }
}

#[must_use]
pub fn format_step_value(value: &StepValue) -> String {
    match value {
        StepValue::String(s) | StepValue::Enum(s) => s.clone(),
        StepValue::Real(f) => f.to_string(),
        StepValue::Integer(i) => i.to_string(),
        StepValue::Boolean(b) => if *b { "True" } else { "False" }.to_string(),
        StepValue::Reference(id) => format!("#{id}"),
        StepValue::List(list) => list
            .iter()
            .map(format_step_value)
            .collect::<Vec<_>>()
            .join(", "),
        StepValue::Null => "-".to_string(),
        StepValue::Derived => "*".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MODEL: &str = "ISO-10303-21;
HEADER;
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCPROJECT('P1',$,'Project',$,$,$,$,$,$);
#2=IFCSITE('S1',$,'Site',$,$,$,$,$,.ELEMENT.,$,$,$,$,$);
#3=IFCBUILDING('B1',$,'Building',$,$,$,$,$,.ELEMENT.,$,$,$);
#4=IFCRELAGGREGATES('R1',$,$,$,#1,(#2));
#5=IFCRELAGGREGATES('R2',$,$,$,#2,(#3));
#10=IFCWALL('W1',$,'Wall',$,'Basic 200',$,$,'T-10',$);
#11=IFCPROXYTHING('X1',$,'Odd',$,$,$,$,$,$);
#12=IFCRELCONTAINEDINSPATIALSTRUCTURE('R3',$,$,$,(#10,#11),#3);
#20=IFCWALLTYPE('WT',$,'Basic',$,$,(#23),$,$,'Basic 200',.STANDARD.);
#21=IFCRELDEFINESBYTYPE('R4',$,$,$,(#10),#20);
#22=IFCPROPERTYSINGLEVALUE('FireRating',$,IFCLABEL('EI30'),$);
#23=IFCPROPERTYSET('PS1',$,'Pset_WallCommon',$,(#22));
#24=IFCPROPERTYSINGLEVALUE('FireRating',$,IFCLABEL('EI60'),$);
#25=IFCPROPERTYSINGLEVALUE('IsExternal',$,IFCBOOLEAN(.T.),$);
#26=IFCPROPERTYSET('PS2',$,'Pset_WallCommon',$,(#24,#25));
#27=IFCRELDEFINESBYPROPERTIES('R5',$,$,$,(#10),#26);
#28=IFCQUANTITYLENGTH('Length',$,$,4.5,$);
#29=IFCELEMENTQUANTITY('Q1',$,'Qto_WallBaseQuantities',$,$,(#28));
#30=IFCRELDEFINESBYPROPERTIES('R6',$,$,$,(#10),#29);
ENDSEC;
END-ISO-10303-21;
";

    #[test]
    fn resolves_project_and_guids() {
        let model = IfcModel::parse(MODEL).unwrap();
        assert_eq!(model.project_guid(), "P1");
        assert_eq!(model.by_guid("W1").unwrap().id(), 10);
        assert!(model.by_guid("nope").is_none());
    }

    #[test]
    fn contained_unknown_classes_count_as_elements() {
        let model = IfcModel::parse(MODEL).unwrap();
        let ids: Vec<u64> = model.elements().iter().map(Entity::id).collect();
        assert_eq!(ids, vec![10, 11]);
        assert_eq!(model.by_type("IfcElement").len(), 2);
        assert_eq!(model.element_types().len(), 1);
    }

    #[test]
    fn walks_decomposition_and_containment() {
        let model = IfcModel::parse(MODEL).unwrap();
        let site = &model.project().unwrap().children()[0];
        assert_eq!(site.class(), "IfcSite");
        let building = &site.children()[0];
        assert_eq!(building.contained_elements().len(), 2);

        let wall = model.by_id(10).unwrap();
        assert_eq!(wall.container().unwrap().name(), Some("Building"));
        assert_eq!(building.container().unwrap().name(), Some("Site"));
    }

    #[test]
    fn occurrence_sets_override_type_sets() {
        let model = IfcModel::parse(MODEL).unwrap();
        let wall = model.by_id(10).unwrap();
        let sets = wall.property_sets();
        assert_eq!(sets["Pset_WallCommon"]["FireRating"], "EI60");
        assert_eq!(sets["Pset_WallCommon"]["IsExternal"], "True");
        assert_eq!(sets["Qto_WallBaseQuantities"]["Length"], "4.5");
        assert_eq!(wall.sets_of_kind(SetKind::Property).len(), 1);
        assert_eq!(
            wall.property(SetKind::Quantity, "Qto_WallBaseQuantities", "Length"),
            Some("4.5".to_string())
        );
    }

    #[test]
    fn attributes_skip_references_and_nulls() {
        let model = IfcModel::parse(MODEL).unwrap();
        let wall = model.by_id(10).unwrap();
        let attributes = wall.attributes();
        assert_eq!(attributes.get("Name").map(String::as_str), Some("Wall"));
        assert_eq!(attributes.get("Tag").map(String::as_str), Some("T-10"));
        assert!(!attributes.contains_key("OwnerHistory"));
        assert_eq!(wall.object_type(), Some("Basic 200"));
        assert_eq!(model.by_id(20).unwrap().object_type(), Some("Basic 200"));
    }

    #[test]
    fn indexes_set_names() {
        let model = IfcModel::parse(MODEL).unwrap();
        let psets = model.pset_info();
        assert_eq!(psets["Pset_WallCommon"], vec!["FireRating", "IsExternal"]);
        assert_eq!(model.qset_info()["Qto_WallBaseQuantities"], vec!["Length"]);
    }

    #[test]
    fn missing_project_is_invalid() {
        let err = IfcModel::parse("ISO-10303-21;DATA;#1=IFCWALL('x',$,$,$);ENDSEC;").unwrap_err();
        assert!(err.to_string().contains("IfcProject"));
    }
}
