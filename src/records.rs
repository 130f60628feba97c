use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectScore {
    pub subject: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub obtained: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub full: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendance {
    #[serde(default, deserialize_with = "lenient_count")]
    pub present: u32,
    #[serde(default, deserialize_with = "lenient_count")]
    pub absent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub roll: String,
    #[serde(deserialize_with = "lenient_string")]
    pub class: String,
    #[serde(deserialize_with = "lenient_string")]
    pub section: String,
    #[serde(default)]
    pub marks: Vec<SubjectScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendance: Option<Attendance>,
}

impl StudentRecord {
    /// Entrant identity inside a cohort. Names collide; roll disambiguates.
    pub fn same_entrant(&self, name: &str, roll: &str) -> bool {
        self.name == name && self.roll == roll
    }
}

/// Record as held by the store: the declared record plus its handle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub id: String,
    pub sort_order: i64,
    #[serde(flatten)]
    pub record: StudentRecord,
}

/// Search filters. `None` is a wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub name: Option<String>,
    pub roll: Option<String>,
    pub class: Option<String>,
    pub section: Option<String>,
}

fn normalize_filter(raw: Option<&str>) -> Option<String> {
    let t = raw?.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

// Cohort keys are compared verbatim; only the empty string is a wildcard.
fn exact_filter(raw: Option<&str>) -> Option<String> {
    raw.filter(|s| !s.is_empty()).map(str::to_string)
}

impl SearchQuery {
    pub fn new(
        name: Option<&str>,
        roll: Option<&str>,
        class: Option<&str>,
        section: Option<&str>,
    ) -> Self {
        Self {
            name: normalize_filter(name).map(|n| n.to_lowercase()),
            roll: normalize_filter(roll),
            class: exact_filter(class),
            section: exact_filter(section),
        }
    }

    pub fn from_params(params: &serde_json::Value) -> Self {
        let field = |key: &str| params.get(key).and_then(value_as_text);
        Self::new(
            field("name").as_deref(),
            field("roll").as_deref(),
            field("class").as_deref(),
            field("section").as_deref(),
        )
    }

    pub fn is_wildcard(&self) -> bool {
        self.name.is_none() && self.roll.is_none() && self.class.is_none() && self.section.is_none()
    }

    pub fn matches(&self, r: &StudentRecord) -> bool {
        let name_ok = self
            .name
            .as_ref()
            .map(|n| r.name.to_lowercase().contains(n.as_str()))
            .unwrap_or(true);
        let roll_ok = self.roll.as_ref().map(|v| r.roll == *v).unwrap_or(true);
        let class_ok = self.class.as_ref().map(|v| r.class == *v).unwrap_or(true);
        let section_ok = self
            .section
            .as_ref()
            .map(|v| r.section == *v)
            .unwrap_or(true);
        name_ok && roll_ok && class_ok && section_ok
    }
}

/// Accepts strings and numbers. Whole numbers render as integers, so `5`
/// and `5.0` both give `"5"`.
pub fn value_as_text(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                Some(format!("{}", f as i64))
            }
            _ => Some(n.to_string()),
        },
        _ => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(value_as_text(&v).unwrap_or_default())
}

// Missing, null and non-numeric scores count as zero.
fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    let n = match v {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(if n.is_finite() { n } else { 0.0 })
}

// Day counts: whole non-negative numbers or numeric strings; anything else
// is zero and fractions are truncated.
fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    let n = match v {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(if n.is_finite() && n > 0.0 {
        n.min(u32::MAX as f64) as u32
    } else {
        0
    })
}

fn score(subject: &str, obtained: f64, full: f64) -> SubjectScore {
    SubjectScore {
        subject: subject.to_string(),
        obtained,
        full,
    }
}

/// Roster used when no roster file is configured.
pub fn demo_records() -> Vec<StudentRecord> {
    vec![
        StudentRecord {
            name: "John Doe".into(),
            roll: "05".into(),
            class: "10".into(),
            section: "A".into(),
            marks: vec![
                score("Mathematics", 92.0, 100.0),
                score("English", 85.0, 100.0),
                score("Science", 88.0, 100.0),
            ],
            attendance: Some(Attendance {
                present: 180,
                absent: 5,
            }),
        },
        StudentRecord {
            name: "Jane Smith".into(),
            roll: "12".into(),
            class: "10".into(),
            section: "A".into(),
            marks: vec![
                score("Mathematics", 90.0, 100.0),
                score("English", 89.0, 100.0),
                score("Science", 86.0, 100.0),
            ],
            attendance: Some(Attendance {
                present: 181,
                absent: 4,
            }),
        },
        StudentRecord {
            name: "Rahim Khan".into(),
            roll: "07".into(),
            class: "10".into(),
            section: "A".into(),
            marks: vec![
                score("Mathematics", 90.0, 100.0),
                score("English", 89.0, 100.0),
                score("Science", 84.0, 100.0),
            ],
            attendance: Some(Attendance {
                present: 179,
                absent: 6,
            }),
        },
        StudentRecord {
            name: "Sara Ali".into(),
            roll: "02".into(),
            class: "10".into(),
            section: "B".into(),
            marks: vec![
                score("Mathematics", 95.0, 100.0),
                score("English", 78.0, 100.0),
                score("Science", 80.0, 100.0),
            ],
            attendance: Some(Attendance {
                present: 182,
                absent: 3,
            }),
        },
        StudentRecord {
            name: "Anik Das".into(),
            roll: "11".into(),
            class: "1".into(),
            section: "A".into(),
            marks: vec![
                score("Math", 80.0, 100.0),
                score("Science", 75.0, 100.0),
                score("English", 85.0, 100.0),
            ],
            attendance: None,
        },
    ]
}
