//! Smart packs and the pack recommendation scorer.
//!
//! A pack bundles modules and questions for one user archetype. The scorer
//! ranks every pack against a partial profile in a single pass; it is a pure
//! function of its inputs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::catalog::Catalog;
use super::navigator::ALWAYS_ASKED_STEPS;
use super::profile::OnboardingProfile;
use crate::error::CatalogError;

/// Pack id that routes the user to hand-picked modules instead of a pack.
pub const CUSTOM_PACK: &str = "custom";

const SENIOR_PACK: &str = "senior";
const YOUTH_PACKS: &[&str] = &["athlete", "fitness", "muscle-building"];
const HIGH_INTENSITY_PACKS: &[&str] = &["athlete", "fitness", "muscle-building"];
const LOW_INTENSITY_PACKS: &[&str] = &["wellness", "senior"];

/// Availability answer, the packs it suits, and the reason shown.
const AVAILABILITY_TABLE: &[(&str, &[&str], &str)] = &[
    ("daily", &["athlete", "muscle-building"], "Perfect for daily training"),
    (
        "1-2-sessions",
        &["wellness", "senior"],
        "Fits your limited availability",
    ),
];

/// Seconds budgeted per remaining pack question.
const SECONDS_PER_PACK_QUESTION: u32 = 30;

/// How demanding a pack is, and how experienced a user says they are.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Map a free-form experience answer onto the three levels.
    pub fn from_level(level: &str) -> Option<Self> {
        match level.trim().to_ascii_lowercase().as_str() {
            "beginner" | "novice" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" | "expert" => Some(Self::Advanced),
            _ => None,
        }
    }

    fn rank(self) -> i8 {
        match self {
            Self::Beginner => 0,
            Self::Intermediate => 1,
            Self::Advanced => 2,
        }
    }

    /// One level apart.
    pub fn is_adjacent(self, other: Self) -> bool {
        (self.rank() - other.rank()).abs() == 1
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Beginner => write!(f, "beginner"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Advanced => write!(f, "advanced"),
        }
    }
}

/// A predefined bundle of modules and questions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SmartPack {
    pub id: String,
    pub name: String,
    pub title: String,
    pub description: String,
    pub sports: Vec<String>,
    pub goals: Vec<String>,
    pub features: Vec<String>,
    pub modules: Vec<String>,
    pub difficulty: Difficulty,
    /// Pack-specific step ids, in the order they are asked.
    pub questions: Vec<String>,
    /// Static 0-100 score.
    pub popularity: u8,
    pub estimated_minutes: u32,
}

/// The profile signals the scorer reads. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PackQuery {
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub experience: Option<Difficulty>,
    #[serde(default)]
    pub availability: Option<String>,
    /// `None` when the user has not answered; `"none"` entries are ignored.
    #[serde(default)]
    pub health_conditions: Option<Vec<String>>,
    #[serde(default)]
    pub wanted_features: Vec<String>,
}

impl PackQuery {
    pub fn from_profile(profile: &OnboardingProfile) -> Self {
        Self {
            age: profile.age(),
            sport: profile.sport().map(String::from),
            objectives: profile.objectives(),
            experience: profile.experience().and_then(Difficulty::from_level),
            availability: profile.availability().map(String::from),
            health_conditions: profile.health_conditions(),
            wanted_features: profile.wanted_features(),
        }
    }

    /// Declared conditions, not counting the explicit "none" answer.
    fn condition_count(&self) -> Option<usize> {
        self.health_conditions
            .as_ref()
            .map(|list| list.iter().filter(|c| c.as_str() != "none").count())
    }
}

/// One scored pack.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PackRecommendation {
    pub pack: SmartPack,
    pub score: f64,
    pub reasons: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_features: Vec<String>,
}

/// Immutable list of packs, in catalog order.
#[derive(Debug, Clone)]
pub struct PackCatalog {
    packs: Vec<SmartPack>,
}

impl PackCatalog {
    /// Build a pack catalog whose questions all exist in `steps`.
    pub fn new(packs: Vec<SmartPack>, steps: &Catalog) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for pack in &packs {
            if pack.id == CUSTOM_PACK || !seen.insert(pack.id.as_str()) {
                return Err(CatalogError::DuplicatePack(pack.id.clone()));
            }
            if let Some(missing) = pack.questions.iter().find(|q| !steps.contains(q)) {
                return Err(CatalogError::UnknownPackQuestion {
                    pack: pack.id.clone(),
                    step: missing.clone(),
                });
            }
        }
        Ok(Self { packs })
    }

    /// The six built-in packs.
    pub fn builtin(steps: &Catalog) -> Result<Self, CatalogError> {
        Self::new(builtin_packs(), steps)
    }

    pub fn packs(&self) -> &[SmartPack] {
        &self.packs
    }

    pub fn get(&self, id: &str) -> Option<&SmartPack> {
        self.packs.iter().find(|p| p.id == id)
    }

    /// Pack-specific question ids; empty for unknown packs.
    pub fn questions_for_pack(&self, id: &str) -> &[String] {
        self.get(id).map(|p| p.questions.as_slice()).unwrap_or(&[])
    }

    /// Whether a question belongs in the selected pack's flow. Unknown packs
    /// ask everything.
    pub fn should_ask_question(&self, question_id: &str, pack_id: &str) -> bool {
        let Some(pack) = self.get(pack_id) else {
            return true;
        };
        ALWAYS_ASKED_STEPS.contains(&question_id) || pack.questions.iter().any(|q| q == question_id)
    }

    /// Rough time left on a pack's own questions.
    pub fn estimated_seconds_for_pack(&self, pack_id: &str, completed_steps: &[String]) -> u32 {
        let Some(pack) = self.get(pack_id) else {
            return 0;
        };
        let remaining = pack
            .questions
            .iter()
            .filter(|q| !completed_steps.contains(q))
            .count() as u32;
        remaining * SECONDS_PER_PACK_QUESTION
    }

    pub fn packs_for_sport(&self, sport: &str) -> Vec<&SmartPack> {
        self.packs
            .iter()
            .filter(|p| p.sports.iter().any(|s| s == sport))
            .collect()
    }

    /// Packs no more than one level above the user's experience, and for
    /// experienced users no easier than intermediate.
    pub fn packs_for_experience(&self, level: Difficulty) -> Vec<&SmartPack> {
        self.packs
            .iter()
            .filter(|p| match level {
                Difficulty::Beginner => p.difficulty == Difficulty::Beginner,
                Difficulty::Intermediate => p.difficulty <= Difficulty::Intermediate,
                Difficulty::Advanced => p.difficulty >= Difficulty::Intermediate,
            })
            .collect()
    }

    /// Most popular packs first; equal popularity keeps catalog order.
    pub fn popular_packs(&self, limit: usize) -> Vec<&SmartPack> {
        let mut packs: Vec<&SmartPack> = self.packs.iter().collect();
        packs.sort_by(|a, b| b.popularity.cmp(&a.popularity));
        packs.truncate(limit);
        packs
    }

    /// Score every pack and return them best first. Ties keep catalog order.
    pub fn recommend(&self, query: &PackQuery) -> Vec<PackRecommendation> {
        let mut ranked: Vec<PackRecommendation> =
            self.packs.iter().map(|pack| score_pack(pack, query)).collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }

    /// The `limit` best packs for a query.
    pub fn top_recommendations(&self, query: &PackQuery, limit: usize) -> Vec<PackRecommendation> {
        let mut ranked = self.recommend(query);
        ranked.truncate(limit);
        ranked
    }
}

fn score_pack(pack: &SmartPack, query: &PackQuery) -> PackRecommendation {
    let mut score = 0.0;
    let mut reasons = Vec::new();
    let is = |ids: &[&str]| ids.contains(&pack.id.as_str());

    let matching_goals = pack
        .goals
        .iter()
        .filter(|goal| query.objectives.contains(goal))
        .count();
    if matching_goals > 0 {
        score += 20.0 * matching_goals as f64;
        reasons.push(format!("Matches {matching_goals} of your objectives"));
    }

    if query.sport.as_ref().is_some_and(|s| pack.sports.contains(s)) {
        score += 25.0;
        reasons.push("Suited to your main sport".to_string());
    }

    if let Some(experience) = query.experience {
        if experience == pack.difficulty {
            score += 15.0;
            reasons.push("Difficulty matches your experience".to_string());
        } else if experience.is_adjacent(pack.difficulty) {
            score += 10.0;
            reasons.push("Difficulty close to your experience".to_string());
        }
    }

    if let Some(age) = query.age {
        if age >= 50 && pack.id == SENIOR_PACK {
            score += 20.0;
            reasons.push("Designed specifically for your age group".to_string());
        } else if age < 30 && is(YOUTH_PACKS) {
            score += 10.0;
            reasons.push("Suited to active young adults".to_string());
        }
    }

    let availability_match = query.availability.as_deref().and_then(|availability| {
        AVAILABILITY_TABLE
            .iter()
            .find(|(bucket, packs, _)| *bucket == availability && packs.contains(&pack.id.as_str()))
    });
    if let Some((_, _, reason)) = availability_match {
        score += 15.0;
        reasons.push(reason.to_string());
    }

    if let Some(count) = query.condition_count() {
        if count == 0 && is(HIGH_INTENSITY_PACKS) {
            score += 10.0;
            reasons.push("No health restrictions".to_string());
        } else if count >= 2 && is(LOW_INTENSITY_PACKS) {
            score += 15.0;
            reasons.push("Gentle approach suited to your health conditions".to_string());
        }
    }

    let missing_features = query
        .wanted_features
        .iter()
        .filter(|wanted| {
            let wanted = wanted.to_lowercase();
            !pack
                .features
                .iter()
                .any(|f| f.to_lowercase().contains(&wanted))
        })
        .cloned()
        .collect();

    score += 0.1 * f64::from(pack.popularity);

    PackRecommendation {
        pack: pack.clone(),
        score,
        reasons,
        missing_features,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn builtin_packs() -> Vec<SmartPack> {
    vec![
        SmartPack {
            id: "athlete".into(),
            name: "Athlete Performance".into(),
            title: "Optimise your sporting performance".into(),
            description: "Sport-specific training to raise your level in your discipline".into(),
            sports: strings(&["football", "basketball", "tennis", "rugby", "running", "cycling", "swimming"]),
            goals: strings(&["performance-sport", "increase-strength", "improve-endurance"]),
            features: strings(&[
                "Sport-specific training plans",
                "Biomechanical analysis",
                "Advanced periodisation",
                "Real-time performance tracking",
                "Tactical advice",
                "Optimised recovery",
                "Performance nutrition",
            ]),
            modules: strings(&["workout", "analytics", "recovery", "nutrition", "mental"]),
            difficulty: Difficulty::Advanced,
            questions: strings(&[
                "sport-selection",
                "position-selection",
                "sport-level",
                "season-period",
                "training-availability",
            ]),
            popularity: 85,
            estimated_minutes: 12,
        },
        SmartPack {
            id: "fitness".into(),
            name: "Complete Fitness".into(),
            title: "All-round physical condition".into(),
            description: "Strength, endurance and aesthetics in one programme".into(),
            sports: strings(&["weightlifting", "crossfit", "running", "cycling"]),
            goals: strings(&["gain-muscle", "lose-weight", "increase-strength", "improve-endurance"]),
            features: strings(&[
                "Progressive strength programmes",
                "Varied cardio sessions",
                "Body composition tracking",
                "Personalised nutrition plans",
                "Mobility work",
                "Motivating challenges",
                "Active community",
            ]),
            modules: strings(&["workout", "nutrition", "analytics", "social", "hydration"]),
            difficulty: Difficulty::Intermediate,
            questions: strings(&[
                "main-objectives",
                "fitness-experience",
                "equipment-available",
                "training-availability",
            ]),
            popularity: 92,
            estimated_minutes: 10,
        },
        SmartPack {
            id: "wellness".into(),
            name: "Holistic Wellness".into(),
            title: "A balanced life".into(),
            description: "A gentle, holistic approach to physical and mental health".into(),
            sports: strings(&["yoga", "walking", "swimming", "tai-chi"]),
            goals: strings(&["stress-relief", "health-maintenance", "improve-flexibility", "improve-sleep"]),
            features: strings(&[
                "Gentle progressive exercise",
                "Guided meditation",
                "Sleep tracking",
                "Stress management",
                "Intuitive nutrition",
                "Healthy habits",
                "Daily mindfulness",
            ]),
            modules: strings(&["sleep", "mental", "hydration", "recovery", "nutrition"]),
            difficulty: Difficulty::Beginner,
            questions: strings(&[
                "lifestyle-preferences",
                "dietary-preferences",
                "sleep-habits",
                "health-conditions",
            ]),
            popularity: 78,
            estimated_minutes: 8,
        },
        SmartPack {
            id: "weight-loss".into(),
            name: "Weight Loss".into(),
            title: "Lasting body transformation".into(),
            description: "Lose weight healthily and sustainably".into(),
            sports: strings(&["walking", "running", "cycling", "swimming"]),
            goals: strings(&["lose-weight", "improve-endurance", "health-maintenance"]),
            features: strings(&[
                "Optimised calorie deficit",
                "Fat-burning workouts",
                "Weight and measurement tracking",
                "Nutrition coaching",
                "Motivational support",
                "Light recipes",
                "Craving management",
            ]),
            modules: strings(&["nutrition", "workout", "analytics", "mental", "hydration"]),
            difficulty: Difficulty::Beginner,
            questions: strings(&[
                "main-objectives",
                "dietary-preferences",
                "training-availability",
                "health-conditions",
            ]),
            popularity: 88,
            estimated_minutes: 9,
        },
        SmartPack {
            id: "muscle-building".into(),
            name: "Muscle Building".into(),
            title: "Optimal muscle growth".into(),
            description: "Intensive programme to maximise muscle gain".into(),
            sports: strings(&["weightlifting", "powerlifting", "bodybuilding"]),
            goals: strings(&["gain-muscle", "increase-strength"]),
            features: strings(&[
                "Intensive strength programmes",
                "Hypertrophy periodisation",
                "Calorie-surplus nutrition",
                "Load and volume tracking",
                "Intensity techniques",
                "Maximised recovery",
                "Targeted supplementation",
            ]),
            modules: strings(&["workout", "nutrition", "recovery", "analytics"]),
            difficulty: Difficulty::Advanced,
            questions: strings(&[
                "fitness-experience",
                "equipment-available",
                "training-availability",
                "nutrition-objectives",
            ]),
            popularity: 75,
            estimated_minutes: 11,
        },
        SmartPack {
            id: "senior".into(),
            name: "Active Senior".into(),
            title: "Vitality after 50".into(),
            description: "Stay fit and healthy after 50".into(),
            sports: strings(&["walking", "swimming", "tai-chi", "golf"]),
            goals: strings(&["health-maintenance", "improve-flexibility", "increase-strength"]),
            features: strings(&[
                "Exercises adapted for seniors",
                "Fall prevention",
                "Bone density maintenance",
                "Cognitive exercises",
                "Integrated health follow-up",
                "Group activities",
                "Very gentle progression",
            ]),
            modules: strings(&["workout", "health", "social", "mental", "recovery"]),
            difficulty: Difficulty::Beginner,
            questions: strings(&["health-conditions", "lifestyle-preferences", "training-availability"]),
            popularity: 65,
            estimated_minutes: 7,
        },
    ]
}
