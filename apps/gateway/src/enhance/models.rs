use serde::{Deserialize, Serialize};

/// Resume text fields the enhancer accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[serde(alias = "professionalSummary")]
    Summary,
    #[serde(alias = "experienceDescription")]
    Experience,
    #[serde(alias = "projectDescription")]
    Project,
    #[serde(alias = "educationDescription")]
    Education,
    #[serde(alias = "achievements")]
    Achievement,
}

impl FieldKind {
    /// Upper bound on input and output length, in characters.
    pub fn max_chars(self) -> usize {
        match self {
            FieldKind::Summary => 1000,
            FieldKind::Experience => 2000,
            FieldKind::Project => 1500,
            FieldKind::Education => 800,
            FieldKind::Achievement => 600,
        }
    }

    /// Human-readable label used in prompts and messages.
    pub fn label(self) -> &'static str {
        match self {
            FieldKind::Summary => "professional summary",
            FieldKind::Experience => "work experience description",
            FieldKind::Project => "project description",
            FieldKind::Education => "education description",
            FieldKind::Achievement => "achievement",
        }
    }

    /// Whether the cleaned output is folded into a single paragraph.
    pub fn single_paragraph(self) -> bool {
        matches!(self, FieldKind::Summary)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnhanceRequest {
    pub field: FieldKind,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct EnhanceResponse {
    pub field: FieldKind,
    pub enhanced: String,
}
