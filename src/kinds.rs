//! Entity-kind catalogue
//!
//! An [`EntityKind`] is a plain value describing one domain category:
//! endpoints, filter keys, relation kinds, response-shape hints and the
//! Cypher templates used by the graph backend. The orchestrator is generic
//! over it; there is no per-kind code.

use crate::error::{OrchestratorError, OrchestratorResult};

/// How the list endpoint receives filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListMethod {
    /// Repeated `key=value` query pairs
    #[default]
    Get,
    /// JSON body `{"filters": {...}}`
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityKind {
    /// Kind name, also used in logs
    pub name: String,
    pub list_endpoint: String,
    pub profile_endpoint: String,
    pub suggestion_endpoint: String,
    pub list_method: ListMethod,
    /// Key wrapping the entity in `{result: {<key>: {properties}}}` payloads
    pub entity_key: Option<String>,
    pub id_field: String,
    pub label_field: String,
    pub secondary_field: Option<String>,
    pub filter_keys: Vec<String>,
    /// Relation kinds in declared order
    pub relation_kinds: Vec<String>,
    /// Relations that hold at most one meaningful entity (e.g. parent)
    pub singular_relations: Vec<String>,
    pub image_path: String,
    pub image_fields: Vec<String>,
    /// Graph backend list statement; receives `$filters`
    pub list_query: Option<String>,
    /// Graph backend profile statement; receives `$id`
    pub profile_query: Option<String>,
}

impl EntityKind {
    pub fn builder(name: &str) -> EntityKindBuilder {
        EntityKindBuilder::new(name)
    }

    pub fn allows_filter(&self, key: &str) -> bool {
        self.filter_keys.iter().any(|k| k == key)
    }

    pub fn is_relation(&self, key: &str) -> bool {
        self.relation_kinds.iter().any(|k| k == key)
    }

    pub fn is_singular(&self, key: &str) -> bool {
        self.singular_relations.iter().any(|k| k == key)
    }

    /// Resolve a preset by its CLI name (`military-group` and `military_group`
    /// both work)
    pub fn by_name(name: &str) -> OrchestratorResult<Self> {
        match name.trim().to_lowercase().replace('_', "-").as_str() {
            "equipment" => Ok(Self::equipment()),
            "organization" | "organisation" => Ok(Self::organization()),
            "installation" => Ok(Self::installation()),
            "military-group" => Ok(Self::military_group()),
            "nsag-actor" | "nsag" => Ok(Self::nsag_actor()),
            _ => Err(OrchestratorError::UnknownKind(name.to_string())),
        }
    }

    /// Names accepted by [`EntityKind::by_name`]
    pub fn preset_names() -> &'static [&'static str] {
        &["equipment", "organization", "installation", "military-group", "nsag-actor"]
    }

    pub fn equipment() -> Self {
        Self::builder("equipment")
            .entity_key("equipment")
            .secondary_field("type")
            .filters(&["type", "role", "operator"])
            .relations(&["manufacturers", "operators", "variants"])
            .images("equipment", &["image", "images"])
            .list_query(list_statement("Equipment", "type", &["type", "role", "operator"]))
            .profile_query(
                "MATCH (e:Equipment {id: $id}) \
                 OPTIONAL MATCH (e)<-[:MANUFACTURES]-(m) \
                 OPTIONAL MATCH (e)<-[:OPERATES]-(o) \
                 OPTIONAL MATCH (e)-[:VARIANT_OF]-(v:Equipment) \
                 RETURN e AS equipment, collect(DISTINCT m) AS manufacturers, \
                 collect(DISTINCT o) AS operators, collect(DISTINCT v) AS variants",
            )
            .build()
    }

    pub fn organization() -> Self {
        Self::builder("organization")
            .entity_key("organization")
            .secondary_field("country")
            .filters(&["type", "country"])
            .relations(&["parentOrganizations", "subsidiaries", "members"])
            .singular(&["parentOrganizations"])
            .images("organizations", &["logo", "image"])
            .list_query(list_statement("Organization", "country", &["type", "country"]))
            .profile_query(
                "MATCH (e:Organization {id: $id}) \
                 OPTIONAL MATCH (e)-[:PART_OF]->(p:Organization) \
                 OPTIONAL MATCH (e)<-[:PART_OF]-(s:Organization) \
                 OPTIONAL MATCH (e)<-[:MEMBER_OF]-(m) \
                 RETURN e AS organization, collect(DISTINCT p) AS parentOrganizations, \
                 collect(DISTINCT s) AS subsidiaries, collect(DISTINCT m) AS members",
            )
            .build()
    }

    pub fn installation() -> Self {
        Self::builder("installation")
            .entity_key("installation")
            .secondary_field("country")
            .filters(&["type", "country"])
            .relations(&["operators", "units"])
            .images("installations", &["image"])
            .list_query(list_statement("Installation", "country", &["type", "country"]))
            .profile_query(
                "MATCH (e:Installation {id: $id}) \
                 OPTIONAL MATCH (e)<-[:OPERATES]-(o) \
                 OPTIONAL MATCH (e)<-[:STATIONED_AT]-(u:MilitaryGroup) \
                 RETURN e AS installation, collect(DISTINCT o) AS operators, \
                 collect(DISTINCT u) AS units",
            )
            .build()
    }

    pub fn military_group() -> Self {
        Self::builder("military-group")
            .list_endpoint("military-groups")
            .entity_key("militaryGroup")
            .secondary_field("echelon")
            .filters(&["branch", "echelon", "country"])
            .relations(&["parentUnits", "subordinateUnits", "equipment", "installations"])
            .singular(&["parentUnits"])
            .images("military-groups", &["insignia", "image"])
            .list_query(list_statement(
                "MilitaryGroup",
                "echelon",
                &["branch", "echelon", "country"],
            ))
            .profile_query(
                "MATCH (e:MilitaryGroup {id: $id}) \
                 OPTIONAL MATCH (e)-[:SUBORDINATE_TO]->(p:MilitaryGroup) \
                 OPTIONAL MATCH (e)<-[:SUBORDINATE_TO]-(s:MilitaryGroup) \
                 OPTIONAL MATCH (e)-[:OPERATES]->(q:Equipment) \
                 OPTIONAL MATCH (e)-[:STATIONED_AT]->(i:Installation) \
                 RETURN e AS militaryGroup, collect(DISTINCT p) AS parentUnits, \
                 collect(DISTINCT s) AS subordinateUnits, collect(DISTINCT q) AS equipment, \
                 collect(DISTINCT i) AS installations",
            )
            .build()
    }

    pub fn nsag_actor() -> Self {
        Self::builder("nsag-actor")
            .list_endpoint("nsag-actors")
            .entity_key("actor")
            .secondary_field("region")
            .filters(&["ideology", "region", "country"])
            .relations(&["affiliations", "leaders", "areasOfOperation"])
            .images("nsag-actors", &["logo", "image"])
            .list_query(list_statement(
                "NSAGActor",
                "region",
                &["ideology", "region", "country"],
            ))
            .profile_query(
                "MATCH (e:NSAGActor {id: $id}) \
                 OPTIONAL MATCH (e)-[:AFFILIATED_WITH]-(a) \
                 OPTIONAL MATCH (e)<-[:LEADS]-(l) \
                 OPTIONAL MATCH (e)-[:OPERATES_IN]->(r) \
                 RETURN e AS actor, collect(DISTINCT a) AS affiliations, \
                 collect(DISTINCT l) AS leaders, collect(DISTINCT r) AS areasOfOperation",
            )
            .build()
    }
}

/// List statement returning `id, name, <secondary>` rows, filtered by the
/// `$filters` map (absent keys match everything)
fn list_statement(label: &str, secondary: &str, filter_keys: &[&str]) -> String {
    let mut statement = format!("MATCH (e:{})", label);
    if !filter_keys.is_empty() {
        let clauses: Vec<String> = filter_keys
            .iter()
            .map(|k| format!("($filters.{k} IS NULL OR e.{k} IN $filters.{k})"))
            .collect();
        statement.push_str(" WHERE ");
        statement.push_str(&clauses.join(" AND "));
    }
    statement.push_str(&format!(
        " RETURN e.id AS id, e.name AS name, e.{} AS {} ORDER BY name",
        secondary, secondary
    ));
    statement
}

/// Builder for [`EntityKind`]; unset endpoints derive from the kind name
pub struct EntityKindBuilder {
    kind: EntityKind,
    list_endpoint_set: bool,
    profile_endpoint_set: bool,
}

impl EntityKindBuilder {
    fn new(name: &str) -> Self {
        Self {
            kind: EntityKind {
                name: name.to_string(),
                list_endpoint: name.to_string(),
                profile_endpoint: String::new(),
                suggestion_endpoint: "search/suggestions".to_string(),
                list_method: ListMethod::Get,
                entity_key: None,
                id_field: "id".to_string(),
                label_field: "name".to_string(),
                secondary_field: None,
                filter_keys: Vec::new(),
                relation_kinds: Vec::new(),
                singular_relations: Vec::new(),
                image_path: name.to_string(),
                image_fields: vec!["image".to_string()],
                list_query: None,
                profile_query: None,
            },
            list_endpoint_set: false,
            profile_endpoint_set: false,
        }
    }

    pub fn list_endpoint(mut self, endpoint: &str) -> Self {
        self.kind.list_endpoint = endpoint.trim_matches('/').to_string();
        self.list_endpoint_set = true;
        self
    }

    pub fn profile_endpoint(mut self, endpoint: &str) -> Self {
        self.kind.profile_endpoint = endpoint.trim_matches('/').to_string();
        self.profile_endpoint_set = true;
        self
    }

    pub fn suggestion_endpoint(mut self, endpoint: &str) -> Self {
        self.kind.suggestion_endpoint = endpoint.trim_matches('/').to_string();
        self
    }

    pub fn list_method(mut self, method: ListMethod) -> Self {
        self.kind.list_method = method;
        self
    }

    pub fn entity_key(mut self, key: &str) -> Self {
        self.kind.entity_key = Some(key.to_string());
        self
    }

    pub fn id_field(mut self, field: &str) -> Self {
        self.kind.id_field = field.to_string();
        self
    }

    pub fn label_field(mut self, field: &str) -> Self {
        self.kind.label_field = field.to_string();
        self
    }

    pub fn secondary_field(mut self, field: &str) -> Self {
        self.kind.secondary_field = Some(field.to_string());
        self
    }

    pub fn filters(mut self, keys: &[&str]) -> Self {
        self.kind.filter_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn relations(mut self, kinds: &[&str]) -> Self {
        self.kind.relation_kinds = kinds.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn singular(mut self, kinds: &[&str]) -> Self {
        self.kind.singular_relations = kinds.iter().map(|k| k.to_string()).collect();
        self
    }

    pub fn images(mut self, path: &str, fields: &[&str]) -> Self {
        self.kind.image_path = path.trim_matches('/').to_string();
        self.kind.image_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn list_query(mut self, statement: impl Into<String>) -> Self {
        self.kind.list_query = Some(statement.into());
        self
    }

    pub fn profile_query(mut self, statement: impl Into<String>) -> Self {
        self.kind.profile_query = Some(statement.into());
        self
    }

    pub fn build(mut self) -> EntityKind {
        if !self.list_endpoint_set {
            self.kind.list_endpoint = self.kind.name.trim_matches('/').to_string();
        }
        if !self.profile_endpoint_set {
            self.kind.profile_endpoint = format!("{}/profile", self.kind.list_endpoint);
        }
        // Singular relations must also be declared relations
        for singular in &self.kind.singular_relations {
            if !self.kind.relation_kinds.contains(singular) {
                self.kind.relation_kinds.push(singular.clone());
            }
        }
        self.kind
    }
}
