use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinType {
    Dry,
    Oily,
    Combination,
    Sensitive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinConcern {
    Blemish,
    Wrinkle,
    Spots,
    Soothe,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Urban,
    Tropical,
    Moderate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllergyCategory {
    Preservatives,
    Fragrances,
    Sulfates,
    Alcohol,
    Silicones,
    Retinoids,
    VitaminC,
    Nuts,
    Soy,
    Lanolin,
}

impl SkinType {
    pub const ALL: [SkinType; 4] = [Self::Dry, Self::Oily, Self::Combination, Self::Sensitive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dry => "dry",
            Self::Oily => "oily",
            Self::Combination => "combination",
            Self::Sensitive => "sensitive",
        }
    }
}

impl SkinConcern {
    pub const ALL: [SkinConcern; 4] = [Self::Blemish, Self::Wrinkle, Self::Spots, Self::Soothe];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blemish => "blemish",
            Self::Wrinkle => "wrinkle",
            Self::Spots => "spots",
            Self::Soothe => "soothe",
        }
    }
}

impl Environment {
    pub const ALL: [Environment; 3] = [Self::Urban, Self::Tropical, Self::Moderate];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Urban => "urban",
            Self::Tropical => "tropical",
            Self::Moderate => "moderate",
        }
    }
}

impl AllergyCategory {
    pub const ALL: [AllergyCategory; 10] = [
        Self::Preservatives,
        Self::Fragrances,
        Self::Sulfates,
        Self::Alcohol,
        Self::Silicones,
        Self::Retinoids,
        Self::VitaminC,
        Self::Nuts,
        Self::Soy,
        Self::Lanolin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preservatives => "preservatives",
            Self::Fragrances => "fragrances",
            Self::Sulfates => "sulfates",
            Self::Alcohol => "alcohol",
            Self::Silicones => "silicones",
            Self::Retinoids => "retinoids",
            Self::VitaminC => "vitamin_c",
            Self::Nuts => "nuts",
            Self::Soy => "soy",
            Self::Lanolin => "lanolin",
        }
    }
}

macro_rules! vocabulary_parsing {
    ($ty:ty, $label:literal) => {
        impl FromStr for $ty {
            type Err = VocabularyError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let normalized = value.trim().to_ascii_lowercase();
                <$ty>::ALL.into_iter().find(|candidate| candidate.as_str() == normalized).ok_or_else(
                    || VocabularyError {
                        vocabulary: $label,
                        value: value.to_string(),
                        expected: <$ty>::ALL
                            .iter()
                            .map(|candidate| candidate.as_str())
                            .collect::<Vec<_>>()
                            .join("|"),
                    },
                )
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

vocabulary_parsing!(SkinType, "skin type");
vocabulary_parsing!(SkinConcern, "skin concern");
vocabulary_parsing!(Environment, "environmental factor");
vocabulary_parsing!(AllergyCategory, "allergy category");

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VocabularyError {
    pub vocabulary: &'static str,
    pub value: String,
    pub expected: String,
}

impl fmt::Display for VocabularyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} `{}` (expected {})", self.vocabulary, self.value, self.expected)
    }
}

impl std::error::Error for VocabularyError {}

/// Survey answers as they arrive from the API layer, before vocabulary checks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileInput {
    #[serde(default)]
    pub skin_type: Option<String>,
    #[serde(default)]
    pub skin_concerns: Vec<String>,
    #[serde(default)]
    pub environmental_factors: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
}

/// A validated profile. Deserialization goes through [`ProfileInput`], so a
/// stored profile is held to the same rules as a fresh survey.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProfileInput")]
pub struct Profile {
    pub skin_type: SkinType,
    pub skin_concerns: Vec<SkinConcern>,
    pub environmental_factors: Environment,
    pub allergies: BTreeSet<AllergyCategory>,
}

impl Profile {
    /// Builds a profile from already-typed answers. Repeated concerns keep their first position.
    pub fn new(
        skin_type: SkinType,
        skin_concerns: impl IntoIterator<Item = SkinConcern>,
        environmental_factors: Environment,
        allergies: impl IntoIterator<Item = AllergyCategory>,
    ) -> Result<Self, DomainError> {
        let mut concerns = Vec::new();
        for concern in skin_concerns {
            if !concerns.contains(&concern) {
                concerns.push(concern);
            }
        }

        if concerns.is_empty() {
            return Err(DomainError::InvalidProfile {
                field: "skin_concerns".to_string(),
                reason: "at least one skin concern is required".to_string(),
            });
        }

        Ok(Self {
            skin_type,
            skin_concerns: concerns,
            environmental_factors,
            allergies: allergies.into_iter().collect(),
        })
    }

    pub fn primary_concern(&self) -> SkinConcern {
        self.skin_concerns[0]
    }

    pub fn secondary_concerns(&self) -> &[SkinConcern] {
        &self.skin_concerns[1..]
    }

    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.skin_type.as_str().as_bytes());
        hasher.update(b"|");
        for concern in &self.skin_concerns {
            hasher.update(concern.as_str().as_bytes());
            hasher.update(b",");
        }
        hasher.update(b"|");
        hasher.update(self.environmental_factors.as_str().as_bytes());
        hasher.update(b"|");
        for allergy in &self.allergies {
            hasher.update(allergy.as_str().as_bytes());
            hasher.update(b",");
        }
        format!("sha256:{:x}", hasher.finalize())
    }
}

impl TryFrom<ProfileInput> for Profile {
    type Error = DomainError;

    fn try_from(input: ProfileInput) -> Result<Self, Self::Error> {
        let skin_type = required_field(input.skin_type.as_deref(), "skin_type")?;
        let skin_type = skin_type.parse::<SkinType>().map_err(|error| invalid("skin_type", error))?;

        let skin_concerns = input
            .skin_concerns
            .iter()
            .map(|value| value.parse::<SkinConcern>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| invalid("skin_concerns", error))?;

        let environment =
            required_field(input.environmental_factors.as_deref(), "environmental_factors")?;
        let environment = environment
            .parse::<Environment>()
            .map_err(|error| invalid("environmental_factors", error))?;

        let allergies = input
            .allergies
            .iter()
            .map(|value| value.parse::<AllergyCategory>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| invalid("allergies", error))?;

        Profile::new(skin_type, skin_concerns, environment, allergies)
    }
}

impl From<&Profile> for ProfileInput {
    fn from(profile: &Profile) -> Self {
        Self {
            skin_type: Some(profile.skin_type.to_string()),
            skin_concerns: profile.skin_concerns.iter().map(ToString::to_string).collect(),
            environmental_factors: Some(profile.environmental_factors.to_string()),
            allergies: profile.allergies.iter().map(ToString::to_string).collect(),
        }
    }
}

fn required_field<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, DomainError> {
    value.filter(|value| !value.trim().is_empty()).ok_or_else(|| DomainError::InvalidProfile {
        field: field.to_string(),
        reason: "field is required".to_string(),
    })
}

fn invalid(field: &str, error: VocabularyError) -> DomainError {
    DomainError::InvalidProfile { field: field.to_string(), reason: error.to_string() }
}

#[cfg(test)]
mod tests {
    use super::{
        AllergyCategory, Environment, Profile, ProfileInput, SkinConcern, SkinType,
    };
    use crate::errors::DomainError;

    fn input(skin_type: &str, concerns: &[&str], environment: &str, allergies: &[&str]) -> ProfileInput {
        ProfileInput {
            skin_type: Some(skin_type.to_string()),
            skin_concerns: concerns.iter().map(|value| value.to_string()).collect(),
            environmental_factors: Some(environment.to_string()),
            allergies: allergies.iter().map(|value| value.to_string()).collect(),
        }
    }

    #[test]
    fn parses_well_formed_profile() {
        let profile = Profile::try_from(input("Dry", &["wrinkle", "spots"], "moderate", &["vitamin_c"]))
            .expect("valid profile");

        assert_eq!(profile.skin_type, SkinType::Dry);
        assert_eq!(profile.primary_concern(), SkinConcern::Wrinkle);
        assert_eq!(profile.secondary_concerns(), &[SkinConcern::Spots]);
        assert_eq!(profile.environmental_factors, Environment::Moderate);
        assert!(profile.allergies.contains(&AllergyCategory::VitaminC));
    }

    #[test]
    fn rejects_unknown_skin_type_with_field_name() {
        let error = Profile::try_from(input("scaly", &["wrinkle"], "urban", &[]))
            .expect_err("unknown skin type must fail");

        assert!(matches!(
            error,
            DomainError::InvalidProfile { ref field, ref reason }
                if field == "skin_type" && reason.contains("dry|oily|combination|sensitive")
        ));
    }

    #[test]
    fn rejects_missing_environment_and_empty_concerns() {
        let mut missing_environment = input("oily", &["blemish"], "urban", &[]);
        missing_environment.environmental_factors = None;
        let error = Profile::try_from(missing_environment).expect_err("environment is required");
        assert!(matches!(error, DomainError::InvalidProfile { ref field, .. } if field == "environmental_factors"));

        let error = Profile::try_from(input("oily", &[], "urban", &[]))
            .expect_err("at least one concern is required");
        assert!(matches!(error, DomainError::InvalidProfile { ref field, .. } if field == "skin_concerns"));
    }

    #[test]
    fn rejects_unknown_allergy_key() {
        let error = Profile::try_from(input("oily", &["blemish"], "urban", &["gluten"]))
            .expect_err("unknown allergy must fail");
        assert!(matches!(error, DomainError::InvalidProfile { ref field, .. } if field == "allergies"));
    }

    #[test]
    fn repeated_concerns_collapse_to_first_occurrence() {
        let profile =
            Profile::try_from(input("combination", &["spots", "soothe", "spots"], "tropical", &[]))
                .expect("valid profile");
        assert_eq!(profile.skin_concerns, vec![SkinConcern::Spots, SkinConcern::Soothe]);
    }

    #[test]
    fn fingerprint_ignores_allergy_input_order_but_not_concern_order() {
        let a = Profile::try_from(input("dry", &["wrinkle", "spots"], "urban", &["nuts", "soy"]))
            .expect("valid profile");
        let b = Profile::try_from(input("dry", &["wrinkle", "spots"], "urban", &["soy", "nuts"]))
            .expect("valid profile");
        let c = Profile::try_from(input("dry", &["spots", "wrinkle"], "urban", &["soy", "nuts"]))
            .expect("valid profile");

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert!(a.fingerprint().starts_with("sha256:"));
    }

    #[test]
    fn input_round_trips_through_typed_profile() {
        let profile = Profile::try_from(input("sensitive", &["soothe"], "moderate", &["fragrances"]))
            .expect("valid profile");
        let back = ProfileInput::from(&profile);
        assert_eq!(Profile::try_from(back).expect("round trip"), profile);
    }

    #[test]
    fn stored_profile_without_concerns_is_rejected_on_read() {
        let error = serde_json::from_str::<Profile>(
            r#"{"skin_type":"dry","skin_concerns":[],"environmental_factors":"urban"}"#,
        )
        .expect_err("empty concerns must not deserialize");
        assert!(error.to_string().contains("skin_concerns"));

        let error = serde_json::from_str::<Profile>(
            r#"{"skin_type":"scaly","skin_concerns":["wrinkle"],"environmental_factors":"urban"}"#,
        )
        .expect_err("unknown skin type must not deserialize");
        assert!(error.to_string().contains("skin_type"));
    }

    #[test]
    fn stored_profile_reads_back_through_validation() {
        let profile = Profile::try_from(input("oily", &["blemish", "spots"], "urban", &["soy"]))
            .expect("valid profile");
        let json = serde_json::to_string(&profile).expect("serialize");

        let back: Profile = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, profile);
        assert_eq!(back.primary_concern(), SkinConcern::Blemish);
    }
}
