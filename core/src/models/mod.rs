pub mod adoption;
pub mod insight;
pub mod species;
pub mod user;
pub mod view;

pub use adoption::{
    AdoptRequest, Adoption, AdoptionDetails, AdoptionEdit, AdoptionStatus, GrowthStage, SpeciesChoice,
};
pub use insight::{AiInsight, InsightRequest, InsightType, NewInsight};
pub use species::{Measure, NewSpecies, SpeciesInput, TreeSpecies};
pub use user::{NewUser, User, UserSummary, ValidUser};
pub use view::AdoptionView;

pub type UserId = u64;
pub type SpeciesId = u64;
pub type AdoptionId = u64;
pub type InsightId = u64;

/// Trim a free-text field, mapping blank input to `None`.
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
