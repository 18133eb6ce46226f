//! Output schemas: field list, primary field and defaults per capability

use serde_json::{Value, json};

use super::CapabilityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Number,
    Integer,
    StringList,
}

#[derive(Debug, Clone, Copy)]
pub enum DefaultValue {
    Str(&'static str),
    Num(f64),
    Int(i64),
    EmptyList,
}

impl DefaultValue {
    pub fn to_value(self) -> Value {
        match self {
            DefaultValue::Str(s) => Value::String(s.to_string()),
            DefaultValue::Num(n) => json!(n),
            DefaultValue::Int(n) => json!(n),
            DefaultValue::EmptyList => Value::Array(Vec::new()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub default: DefaultValue,
}

const fn field(name: &'static str, kind: FieldKind, default: DefaultValue) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        default,
    }
}

/// Schema for one capability. `fields[0]` is the primary (required) field;
/// every other field is filled from its default when absent.
#[derive(Debug)]
pub struct Schema {
    pub kind: CapabilityKind,
    pub fields: &'static [FieldSpec],
    /// Free-text capabilities accept the whole reply as the primary value
    pub free_text: bool,
}

impl Schema {
    pub fn primary(&self) -> &FieldSpec {
        &self.fields[0]
    }

    pub fn optional_fields(&self) -> &[FieldSpec] {
        &self.fields[1..]
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

use DefaultValue::{EmptyList, Int, Num, Str};
use FieldKind::{Integer, Number, String as Text, StringList};

static CAPTION_FIELDS: [FieldSpec; 4] = [
    field("caption", Text, Str("")),
    field("hashtags", StringList, EmptyList),
    field("cta", Text, Str("Follow for more!")),
    field("style", Text, Str("custom")),
];

static HOOK_FIELDS: [FieldSpec; 6] = [
    field("frame_index", Integer, Int(0)),
    field("timestamp_sec", Number, Num(1.0)),
    field("hook_score", Integer, Int(72)),
    field("reason", Text, Str("AI analysis completed")),
    field("visual_elements", StringList, EmptyList),
    field("improvement_tip", Text, Str("Add text overlay in first 2 seconds")),
];

static SCRIPT_FIELDS: [FieldSpec; 5] = [
    field("high_retention_hook", Text, Str("")),
    field("average_hook", Text, Str("")),
    field("why_high_retention_works", Text, Str("")),
    field("retention_score", Number, Num(0.0)),
    field("retention_score_reason", Text, Str("")),
];

static PERSONA_FIELDS: [FieldSpec; 6] = [
    field("persona_name", Text, Str("")),
    field("summary", Text, Str("")),
    field("age_range", Text, Str("18-34")),
    field("interests", StringList, EmptyList),
    field("content_preferences", StringList, EmptyList),
    field("best_platform", Text, Str("instagram")),
];

static NARRATIVE_FIELDS: [FieldSpec; 4] = [
    field("summary", Text, Str("")),
    field("headline", Text, Str("Performance overview")),
    field("highlights", StringList, EmptyList),
    field("recommendations", StringList, EmptyList),
];

static QUERY_FIELDS: [FieldSpec; 1] = [field("answer", Text, Str(""))];

static INSIGHT_FIELDS: [FieldSpec; 1] = [field("summary", Text, Str(""))];

pub static CAPTION_SCHEMA: Schema = Schema {
    kind: CapabilityKind::CaptionGeneration,
    fields: &CAPTION_FIELDS,
    free_text: false,
};

pub static HOOK_SCHEMA: Schema = Schema {
    kind: CapabilityKind::HookDetection,
    fields: &HOOK_FIELDS,
    free_text: false,
};

pub static SCRIPT_SCHEMA: Schema = Schema {
    kind: CapabilityKind::ScriptAnalysis,
    fields: &SCRIPT_FIELDS,
    free_text: false,
};

pub static PERSONA_SCHEMA: Schema = Schema {
    kind: CapabilityKind::PersonaGeneration,
    fields: &PERSONA_FIELDS,
    free_text: false,
};

pub static NARRATIVE_SCHEMA: Schema = Schema {
    kind: CapabilityKind::NarrativeReport,
    fields: &NARRATIVE_FIELDS,
    free_text: false,
};

pub static QUERY_SCHEMA: Schema = Schema {
    kind: CapabilityKind::AnalyticsQuery,
    fields: &QUERY_FIELDS,
    free_text: true,
};

pub static INSIGHT_SCHEMA: Schema = Schema {
    kind: CapabilityKind::InsightSummary,
    fields: &INSIGHT_FIELDS,
    free_text: true,
};

pub fn schema_for(kind: CapabilityKind) -> &'static Schema {
    match kind {
        CapabilityKind::CaptionGeneration => &CAPTION_SCHEMA,
        CapabilityKind::HookDetection => &HOOK_SCHEMA,
        CapabilityKind::ScriptAnalysis => &SCRIPT_SCHEMA,
        CapabilityKind::PersonaGeneration => &PERSONA_SCHEMA,
        CapabilityKind::NarrativeReport => &NARRATIVE_SCHEMA,
        CapabilityKind::AnalyticsQuery => &QUERY_SCHEMA,
        CapabilityKind::InsightSummary => &INSIGHT_SCHEMA,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_maps_to_its_own_schema() {
        for kind in CapabilityKind::ALL {
            assert_eq!(schema_for(kind).kind, kind);
        }
    }

    #[test]
    fn primary_fields() {
        assert_eq!(CAPTION_SCHEMA.primary().name, "caption");
        assert_eq!(HOOK_SCHEMA.primary().name, "frame_index");
        assert_eq!(SCRIPT_SCHEMA.primary().name, "high_retention_hook");
        assert_eq!(QUERY_SCHEMA.primary().name, "answer");
        assert!(INSIGHT_SCHEMA.free_text);
    }
}
