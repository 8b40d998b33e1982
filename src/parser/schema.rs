//! Minimal class knowledge needed to classify STEP entities.
//!
//! This is not an IFC schema: it only lists the class names the tree
//! builders and validators need to tell elements, element types and spatial
//! structure apart, and to print class names in their usual casing.

/// Occurrence classes that derive from `IfcElement`.
pub const ELEMENT_CLASSES: &[&str] = &[
    "IfcElement",
    "IfcBuildingElement",
    "IfcBuiltElement",
    "IfcBuildingElementProxy",
    "IfcBeam",
    "IfcBeamStandardCase",
    "IfcChimney",
    "IfcColumn",
    "IfcColumnStandardCase",
    "IfcCovering",
    "IfcCurtainWall",
    "IfcDoor",
    "IfcDoorStandardCase",
    "IfcFooting",
    "IfcMember",
    "IfcMemberStandardCase",
    "IfcPile",
    "IfcPlate",
    "IfcPlateStandardCase",
    "IfcRailing",
    "IfcRamp",
    "IfcRampFlight",
    "IfcRoof",
    "IfcShadingDevice",
    "IfcSlab",
    "IfcSlabStandardCase",
    "IfcSlabElementedCase",
    "IfcStair",
    "IfcStairFlight",
    "IfcWall",
    "IfcWallStandardCase",
    "IfcWallElementedCase",
    "IfcWindow",
    "IfcWindowStandardCase",
    "IfcElementAssembly",
    "IfcFurnishingElement",
    "IfcFurniture",
    "IfcSystemFurnitureElement",
    "IfcTransportElement",
    "IfcVirtualElement",
    "IfcGeographicElement",
    "IfcCivilElement",
    "IfcOpeningElement",
    "IfcOpeningStandardCase",
    "IfcProjectionElement",
    "IfcDiscreteAccessory",
    "IfcFastener",
    "IfcMechanicalFastener",
    "IfcReinforcingBar",
    "IfcReinforcingMesh",
    "IfcTendon",
    "IfcDistributionElement",
    "IfcDistributionFlowElement",
    "IfcDistributionControlElement",
    "IfcFlowTerminal",
    "IfcFlowSegment",
    "IfcFlowFitting",
    "IfcFlowController",
    "IfcFlowMovingDevice",
    "IfcFlowStorageDevice",
    "IfcFlowTreatmentDevice",
    "IfcEnergyConversionDevice",
    "IfcAirTerminal",
    "IfcSanitaryTerminal",
    "IfcLightFixture",
    "IfcLamp",
    "IfcOutlet",
    "IfcSpaceHeater",
    "IfcDuctSegment",
    "IfcDuctFitting",
    "IfcPipeSegment",
    "IfcPipeFitting",
    "IfcCableSegment",
    "IfcCableCarrierSegment",
    "IfcValve",
    "IfcPump",
    "IfcSensor",
    "IfcAlarm",
];

/// Classes that derive from `IfcSpatialStructureElement` (or `IfcSpatialElement`).
pub const SPATIAL_CLASSES: &[&str] = &[
    "IfcSite",
    "IfcBuilding",
    "IfcBuildingStorey",
    "IfcSpace",
    "IfcFacility",
    "IfcFacilityPart",
    "IfcBridge",
    "IfcRoad",
    "IfcRailway",
    "IfcMarineFacility",
    "IfcExternalSpatialElement",
];

/// Type object classes whose name does not end in `Type`.
pub const STYLE_TYPE_CLASSES: &[&str] = &["IfcDoorStyle", "IfcWindowStyle"];

/// Other classes printed with their usual casing.
const OTHER_CLASSES: &[&str] = &[
    "IfcProject",
    "IfcPropertySet",
    "IfcElementQuantity",
    "IfcPropertySingleValue",
    "IfcRelAggregates",
    "IfcRelNests",
    "IfcRelContainedInSpatialStructure",
    "IfcRelDefinesByType",
    "IfcRelDefinesByProperties",
    "IfcWallType",
    "IfcDoorType",
    "IfcWindowType",
    "IfcSlabType",
    "IfcBeamType",
    "IfcColumnType",
    "IfcCoveringType",
    "IfcRailingType",
    "IfcRoofType",
    "IfcStairType",
    "IfcStairFlightType",
    "IfcMemberType",
    "IfcPlateType",
    "IfcCurtainWallType",
    "IfcFurnitureType",
    "IfcFurnishingElementType",
    "IfcBuildingElementProxyType",
    "IfcSanitaryTerminalType",
    "IfcFlowTerminalType",
    "IfcAirTerminalType",
    "IfcLightFixtureType",
    "IfcSpaceType",
    "IfcTypeObject",
    "IfcTypeProduct",
    "IfcElementType",
];

/// Upper case STEP type name (`IFCWALL`) to the usual class name (`IfcWall`).
#[must_use]
pub fn class_name(step_type: &str) -> String {
    ELEMENT_CLASSES
        .iter()
        .chain(SPATIAL_CLASSES)
        .chain(STYLE_TYPE_CLASSES)
        .chain(OTHER_CLASSES)
        .find(|name| name.eq_ignore_ascii_case(step_type))
        .map_or_else(|| fallback_class_name(step_type), |name| (*name).to_string())
}

fn fallback_class_name(step_type: &str) -> String {
    let lower = step_type.to_ascii_lowercase();
    match lower.strip_prefix("ifc") {
        Some(rest) => {
            let mut chars = rest.chars();
            match chars.next() {
                Some(first) => format!("Ifc{}{}", first.to_ascii_uppercase(), chars.as_str()),
                None => "Ifc".to_string(),
            }
        }
        None => step_type.to_string(),
    }
}

#[must_use]
pub fn is_element_class(step_type: &str) -> bool {
    ELEMENT_CLASSES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(step_type))
}

#[must_use]
pub fn is_spatial_class(step_type: &str) -> bool {
    SPATIAL_CLASSES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(step_type))
}

#[must_use]
pub fn is_type_class(step_type: &str) -> bool {
    let upper = step_type.to_ascii_uppercase();
    (upper.starts_with("IFC") && upper.ends_with("TYPE") && upper != "IFCTYPE")
        || STYLE_TYPE_CLASSES
            .iter()
            .any(|name| name.eq_ignore_ascii_case(&upper))
}

/// Attribute names by position for the common rooted classes.
///
/// Positions beyond the known prefix are named `Attribute<N>`.
#[must_use]
pub fn attribute_names(step_type: &str) -> &'static [&'static str] {
    const ROOT: &[&str] = &["GlobalId", "OwnerHistory", "Name", "Description"];
    const PROJECT: &[&str] = &[
        "GlobalId",
        "OwnerHistory",
        "Name",
        "Description",
        "ObjectType",
        "LongName",
        "Phase",
        "RepresentationContexts",
        "UnitsInContext",
    ];
    const ELEMENT: &[&str] = &[
        "GlobalId",
        "OwnerHistory",
        "Name",
        "Description",
        "ObjectType",
        "ObjectPlacement",
        "Representation",
        "Tag",
        "PredefinedType",
    ];
    const SPATIAL: &[&str] = &[
        "GlobalId",
        "OwnerHistory",
        "Name",
        "Description",
        "ObjectType",
        "ObjectPlacement",
        "Representation",
        "LongName",
        "CompositionType",
    ];
    const TYPE: &[&str] = &[
        "GlobalId",
        "OwnerHistory",
        "Name",
        "Description",
        "ApplicableOccurrence",
        "HasPropertySets",
        "RepresentationMaps",
        "Tag",
        "ElementType",
        "PredefinedType",
    ];

    if step_type.eq_ignore_ascii_case("IfcProject") {
        PROJECT
    } else if is_element_class(step_type) {
        ELEMENT
    } else if is_spatial_class(step_type) {
        SPATIAL
    } else if is_type_class(step_type) {
        TYPE
    } else {
        ROOT
    }
}
