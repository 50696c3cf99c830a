//! Well-known namespace IRIs.

pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS_NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const OWL_NS: &str = "http://www.w3.org/2002/07/owl#";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";
pub const SH_NS: &str = "http://www.w3.org/ns/shacl#";
pub const DCTERMS_NS: &str = "http://purl.org/dc/terms/";
pub const DCAT_NS: &str = "http://www.w3.org/ns/dcat#";
pub const VOID_NS: &str = "http://rdfs.org/ns/void#";
pub const PROV_NS: &str = "http://www.w3.org/ns/prov#";

/// Structural vocabularies never reported as dataset vocabularies.
pub const BUILTIN_NAMESPACES: [&str; 4] = [RDF_NS, RDFS_NS, OWL_NS, XSD_NS];

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDF_PROPERTY: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#Property";
pub const RDF_FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
pub const RDF_REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
pub const RDF_NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

pub const RDFS_CLASS: &str = "http://www.w3.org/2000/01/rdf-schema#Class";
pub const RDFS_SUB_CLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
pub const RDFS_SUB_PROPERTY_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subPropertyOf";
pub const RDFS_DOMAIN: &str = "http://www.w3.org/2000/01/rdf-schema#domain";
pub const RDFS_RANGE: &str = "http://www.w3.org/2000/01/rdf-schema#range";

pub const OWL_CLASS: &str = "http://www.w3.org/2002/07/owl#Class";
pub const OWL_OBJECT_PROPERTY: &str = "http://www.w3.org/2002/07/owl#ObjectProperty";
pub const OWL_DATATYPE_PROPERTY: &str = "http://www.w3.org/2002/07/owl#DatatypeProperty";

pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

/// `rdf`, `rdfs`, `owl`, `xsd` plus the metadata vocabularies, for binding
/// prefixes on generated graphs.
pub const METADATA_PREFIXES: [(&str, &str); 8] = [
    ("dcterms", DCTERMS_NS),
    ("dcat", DCAT_NS),
    ("void", VOID_NS),
    ("prov", PROV_NS),
    ("owl", OWL_NS),
    ("rdf", RDF_NS),
    ("rdfs", RDFS_NS),
    ("xsd", XSD_NS),
];

pub fn rdf(local: &str) -> String {
    format!("{RDF_NS}{local}")
}

pub fn sh(local: &str) -> String {
    format!("{SH_NS}{local}")
}

pub fn is_builtin_namespace(namespace: &str) -> bool {
    BUILTIN_NAMESPACES.contains(&namespace)
}
