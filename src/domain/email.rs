/// Headline data for one inbox message. Missing headers read as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailSummary {
    pub subject: String,
    pub from: String,
    pub snippet: String,
}
