use crate::errors::AppError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

// ============ Upstream Results ============

/// Outcome of a sub-resource call that must not abort its siblings.
#[derive(Debug, Clone, PartialEq)]
pub enum SubResource {
    /// Valid upstream payload.
    Present(Value),
    /// Upstream reported 404.
    Absent,
    /// Any other failure, captured verbatim for diagnostics.
    Error {
        error: Value,
        status: u16,
        url: String,
    },
}

impl SubResource {
    pub fn as_present(&self) -> Option<&Value> {
        match self {
            SubResource::Present(value) => Some(value),
            _ => None,
        }
    }

    /// Short label for logs.
    pub fn state(&self) -> &'static str {
        match self {
            SubResource::Present(_) => "present",
            SubResource::Absent => "absent",
            SubResource::Error { .. } => "error",
        }
    }
}

impl Serialize for SubResource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SubResource::Present(value) => value.serialize(serializer),
            SubResource::Absent => serializer.serialize_none(),
            SubResource::Error { error, status, url } => json!({
                "_error": error,
                "_status": status,
                "_url": url,
            })
            .serialize(serializer),
        }
    }
}

/// Primary profile plus the sub-resources that are threaded into responses.
///
/// The owner (`eigenaar`) sub-resource is fetched alongside the others but is
/// intentionally not part of this bundle.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileBundle {
    pub basisprofiel: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hoofdvestiging: Option<SubResource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vestigingen: Option<SubResource>,
}

/// Profile bundle extended with naming history and branch profiles.
///
/// Keys for stages that were not requested are omitted; a requested naming
/// history that upstream reports absent serializes as `null`.
#[derive(Debug, Clone, Serialize)]
pub struct FullProfileBundle {
    pub details: ProfileBundle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub naamgeving: Option<Option<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vestigingsnummers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vestigingsprofielen: Option<Vec<Option<Value>>>,
}

// ============ Search ============

/// Query sent to the `zoeken` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub name: String,
    pub place: Option<String>,
    pub street: Option<String>,
    pub page: u32,
    pub per_page: u32,
    pub include_inactive: bool,
}

impl SearchQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            place: None,
            street: None,
            page: 1,
            per_page: 10,
            include_inactive: false,
        }
    }

    /// Upstream query parameters; flags are rendered as literal "true"/"false".
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("naam", self.name.clone()),
            ("pagina", self.page.to_string()),
            ("resultatenPerPagina", self.per_page.to_string()),
            (
                "inclusiefInactieveRegistraties",
                self.include_inactive.to_string(),
            ),
        ];
        if let Some(ref place) = self.place {
            params.push(("plaats", place.clone()));
        }
        if let Some(ref street) = self.street {
            params.push(("straatnaam", street.clone()));
        }
        params
    }
}

// ============ HTTP Query Parameters ============

/// Query parameters of `GET /company`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyQueryParams {
    pub kvk_number: Option<String>,
    pub name: Option<String>,
    pub place: Option<String>,
    pub street: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub include_inactive: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub geo_data: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub include_subresources: Option<bool>,
}

/// Identifier a company lookup starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanyLookup<'a> {
    KvkNumber(&'a str),
    Name(&'a str),
}

impl CompanyQueryParams {
    /// A KVK number takes precedence over a name; neither is a bad request.
    pub fn lookup(&self) -> Result<CompanyLookup<'_>, AppError> {
        if let Some(kvk_number) = non_empty(&self.kvk_number) {
            return Ok(CompanyLookup::KvkNumber(kvk_number));
        }
        non_empty(&self.name)
            .map(CompanyLookup::Name)
            .ok_or_else(|| AppError::BadRequest("Provide either kvk_number or name".to_string()))
    }
}

/// Query parameters of `GET /company/full`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FullProfileQueryParams {
    pub kvk_number: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub geo_data: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub include_subresources: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub include_naamgeving: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub include_vestigingsprofielen: Option<bool>,
}

/// Options for a full-profile lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullProfileOptions {
    pub geo_data: bool,
    pub include_subresources: bool,
    pub include_naamgeving: bool,
    pub include_vestigingsprofielen: bool,
}

impl Default for FullProfileOptions {
    fn default() -> Self {
        Self {
            geo_data: false,
            include_subresources: true,
            include_naamgeving: true,
            include_vestigingsprofielen: true,
        }
    }
}

/// Parses the boolean spellings accepted in query strings.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|value| {
        parse_flag(&value)
            .ok_or_else(|| de::Error::custom(format!("invalid boolean value '{}'", value)))
    })
    .transpose()
}

/// KVK and branch numbers are non-empty ASCII alphanumerics.
pub fn is_valid_identifier(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Treats empty or whitespace-only query values as missing.
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

// ============ Response Envelopes ============

/// Echo of the identifiers a company was resolved from.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CompanyInput {
    Number {
        kvk_number: String,
    },
    Name {
        name: String,
        place: Option<String>,
        street: Option<String>,
    },
}

/// Raw search response plus the result that was picked.
#[derive(Debug, Clone, Serialize)]
pub struct SearchSelection {
    pub raw: Value,
    pub selected_result: Value,
}

/// Response of `GET /company`.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyResponse {
    pub input: CompanyInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchSelection>,
    pub details: ProfileBundle,
}

/// Response of `GET /company/full`.
#[derive(Debug, Clone, Serialize)]
pub struct FullProfileResponse {
    pub input: CompanyInput,
    #[serde(flatten)]
    pub profile: FullProfileBundle,
}

/// Response of `GET /vestiging/{vestigingsnummer}`.
#[derive(Debug, Clone, Serialize)]
pub struct VestigingResponse {
    pub vestigingsnummer: String,
    pub vestigingsprofiel: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sub_resource_states_serialize_distinctly() {
        let present = serde_json::to_value(SubResource::Present(json!({"a": 1}))).unwrap();
        assert_eq!(present, json!({"a": 1}));

        let absent = serde_json::to_value(SubResource::Absent).unwrap();
        assert_eq!(absent, Value::Null);

        let error = serde_json::to_value(SubResource::Error {
            error: json!({"raw": "boom"}),
            status: 500,
            url: "http://kvk/x".to_string(),
        })
        .unwrap();
        assert_eq!(error["_status"], 500);
        assert_eq!(error["_url"], "http://kvk/x");
        assert_eq!(error["_error"]["raw"], "boom");
    }

    #[test]
    fn test_search_params() {
        let mut query = SearchQuery::new("test");
        query.place = Some("Veendam".to_string());
        let params = query.to_params();
        assert!(params.contains(&("naam", "test".to_string())));
        assert!(params.contains(&("pagina", "1".to_string())));
        assert!(params.contains(&("resultatenPerPagina", "10".to_string())));
        assert!(params.contains(&("inclusiefInactieveRegistraties", "false".to_string())));
        assert!(params.contains(&("plaats", "Veendam".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "straatnaam"));
    }

    #[test]
    fn test_company_lookup_precedence() {
        let params = CompanyQueryParams {
            kvk_number: Some(" 69599068 ".to_string()),
            name: Some("test".to_string()),
            ..Default::default()
        };
        assert_eq!(params.lookup().unwrap(), CompanyLookup::KvkNumber("69599068"));

        let params = CompanyQueryParams {
            kvk_number: Some("".to_string()),
            name: Some("test".to_string()),
            ..Default::default()
        };
        assert_eq!(params.lookup().unwrap(), CompanyLookup::Name("test"));

        assert!(matches!(
            CompanyQueryParams::default().lookup(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_identifier_charset() {
        assert!(is_valid_identifier("69599068"));
        assert!(is_valid_identifier("000037178598"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("../1"));
        assert!(!is_valid_identifier("1/eigenaar"));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_full_profile_omits_unrequested_stages() {
        let bundle = FullProfileBundle {
            details: ProfileBundle {
                basisprofiel: json!({"kvkNummer": "69599068"}),
                hoofdvestiging: None,
                vestigingen: None,
            },
            naamgeving: Some(None),
            vestigingsnummers: None,
            vestigingsprofielen: None,
        };
        let value = serde_json::to_value(bundle).unwrap();
        assert_eq!(value["naamgeving"], Value::Null);
        assert!(value.as_object().unwrap().contains_key("naamgeving"));
        assert!(!value.as_object().unwrap().contains_key("vestigingsprofielen"));
        assert!(!value["details"].as_object().unwrap().contains_key("hoofdvestiging"));
    }
}
