//! The built-in fitness onboarding flow.
//!
//! Steps are listed in catalog order. Pack-scoped flows visit a subset of
//! them; the unscoped flow walks every step.

use serde_json::{Value, json};

use super::profile::OnboardingProfile;
use super::step::{InputKind, NextStep, StepDefinition, StepOption, ValidationRule};
use crate::error::CatalogError;

/// A sport offered on the sport selector.
#[derive(Debug, Clone, Copy)]
pub struct Sport {
    pub id: &'static str,
    pub name: &'static str,
    pub positions: &'static [&'static str],
}

pub static SPORTS: &[Sport] = &[
    Sport {
        id: "football",
        name: "Football",
        positions: &[
            "goalkeeper",
            "centre-back",
            "full-back",
            "defensive-midfielder",
            "central-midfielder",
            "attacking-midfielder",
            "winger",
            "striker",
        ],
    },
    Sport {
        id: "basketball",
        name: "Basketball",
        positions: &["point-guard", "shooting-guard", "small-forward", "power-forward", "center"],
    },
    Sport {
        id: "rugby",
        name: "Rugby",
        positions: &["prop", "hooker", "lock", "flanker", "scrum-half", "fly-half", "centre", "wing", "full-back"],
    },
    Sport {
        id: "tennis",
        name: "Tennis",
        positions: &["baseliner", "serve-and-volley", "counter-puncher"],
    },
    Sport {
        id: "running",
        name: "Running",
        positions: &["sprint", "middle-distance", "long-distance", "trail"],
    },
    Sport {
        id: "cycling",
        name: "Cycling",
        positions: &["road", "mountain", "track", "bmx"],
    },
    Sport {
        id: "swimming",
        name: "Swimming",
        positions: &["freestyle", "backstroke", "breaststroke", "butterfly", "medley"],
    },
    Sport {
        id: "weightlifting",
        name: "Weightlifting",
        positions: &["strength", "hypertrophy", "endurance", "powerlifting"],
    },
    Sport {
        id: "crossfit",
        name: "CrossFit",
        positions: &["wod", "strength", "cardio"],
    },
    Sport { id: "powerlifting", name: "Powerlifting", positions: &[] },
    Sport { id: "bodybuilding", name: "Bodybuilding", positions: &[] },
    Sport { id: "yoga", name: "Yoga", positions: &[] },
    Sport { id: "walking", name: "Walking", positions: &[] },
    Sport { id: "tai-chi", name: "Tai chi", positions: &[] },
    Sport { id: "golf", name: "Golf", positions: &[] },
];

pub fn find_sport(id: &str) -> Option<&'static Sport> {
    SPORTS.iter().find(|s| s.id == id)
}

/// Sports with positions get the position question; everyone else goes
/// straight to their level. A skipped or unknown sport counts as "no
/// positions".
fn after_sport(answer: &Value, _profile: &OnboardingProfile) -> String {
    let has_positions = answer
        .as_str()
        .and_then(find_sport)
        .is_some_and(|sport| !sport.positions.is_empty());
    if has_positions {
        "position-selection".to_string()
    } else {
        "sport-level".to_string()
    }
}

/// Options that depend on earlier answers rather than on the catalog.
pub fn dynamic_options(step_id: &str, profile: &OnboardingProfile) -> Option<Vec<StepOption>> {
    match step_id {
        "position-selection" => {
            let sport = profile.sport().and_then(find_sport)?;
            Some(
                sport
                    .positions
                    .iter()
                    .map(|p| StepOption::new(p, p))
                    .collect(),
            )
        }
        _ => None,
    }
}

fn choices(pairs: &[(&str, &str)]) -> Vec<StepOption> {
    pairs.iter().map(|(id, label)| StepOption::new(id, label)).collect()
}

/// Pattern rule whose build error names the step and the expression.
fn pattern(step: &str, expr: &str, message: &str) -> Result<ValidationRule, CatalogError> {
    ValidationRule::pattern(expr, message).map_err(|e| CatalogError::InvalidPattern {
        step: step.to_string(),
        pattern: expr.to_string(),
        reason: e.to_string(),
    })
}

/// Build the built-in step list.
pub fn builtin_steps() -> Result<Vec<StepDefinition>, CatalogError> {
    let sport_options = SPORTS
        .iter()
        .map(|s| StepOption::new(s.id, s.name))
        .collect();

    Ok(vec![
        StepDefinition::new("welcome", InputKind::Text, "What should we call you?")
            .title("Welcome to MyFitHero!")
            .subtitle("Let's get to know each other")
            .tags(&["identity"])
            .rule(ValidationRule::required("Your first name is required"))
            .rule(ValidationRule::min(2.0, "Your first name must be at least 2 characters"))
            .rule(ValidationRule::max(50.0, "Your first name must be at most 50 characters"))
            .rule(pattern(
                "welcome",
                r"^\p{L}[\p{L}' -]*$",
                "Your first name may only contain letters, spaces, hyphens and apostrophes",
            )?)
            .then("pack-selection")
            .seconds(30)
            .tip("Be honest: the more precise your answers, the better we can tailor your experience."),
        StepDefinition::new(
            "pack-selection",
            InputKind::PackSelector,
            "Which pack fits your needs best?",
        )
        .title("Choose your pack")
        .tags(&["packs"])
        .rule(ValidationRule::required("Please choose a pack"))
        .next(NextStep::Branch {
            cases: vec![(json!("custom"), "module-selection".to_string())],
            otherwise: "main-objectives".to_string(),
        })
        .seconds(90)
        .tip("You can change pack later from your settings."),
        StepDefinition::new(
            "module-selection",
            InputKind::MultiChoice,
            "Which areas would you like to track?",
        )
        .title("Custom modules")
        .tags(&["packs", "modules"])
        .options(choices(&[
            ("sport", "Sport"),
            ("workout", "Workout"),
            ("nutrition", "Nutrition"),
            ("recovery", "Recovery"),
            ("sleep", "Sleep"),
            ("hydration", "Hydration"),
            ("mental", "Mental"),
            ("analytics", "Analytics"),
            ("social", "Social"),
        ]))
        .rule(ValidationRule::required("Please select at least one module"))
        .rule(ValidationRule::min(1.0, "Select at least one module"))
        .then("main-objectives")
        .seconds(60),
        StepDefinition::new(
            "main-objectives",
            InputKind::MultiChoice,
            "What do you want to achieve?",
        )
        .title("Your objectives")
        .tags(&["goals"])
        .options(choices(&[
            ("lose-weight", "Lose weight"),
            ("gain-muscle", "Gain muscle"),
            ("improve-endurance", "Improve endurance"),
            ("increase-strength", "Increase strength"),
            ("improve-flexibility", "Improve flexibility"),
            ("stress-relief", "Reduce stress"),
            ("performance-sport", "Sport performance"),
            ("health-maintenance", "Stay healthy"),
            ("improve-sleep", "Sleep better"),
        ]))
        .rule(ValidationRule::required("Please choose at least one objective"))
        .rule(ValidationRule::max(3.0, "Choose at most three objectives"))
        .then("sport-selection")
        .seconds(45)
        .tip("You can pick several objectives; we will prioritise them for you."),
        StepDefinition::new(
            "sport-selection",
            InputKind::SportSelector,
            "What is your main sport?",
        )
        .title("Your sport")
        .tags(&["sport"])
        .options(sport_options)
        .rule(ValidationRule::required("Please choose a sport"))
        .next(NextStep::Computed(after_sport))
        .seconds(45)
        .tip("Feel free to pick something new you want to try."),
        StepDefinition::new(
            "position-selection",
            InputKind::SingleChoice,
            "Which position or discipline do you play?",
        )
        .title("Your position")
        .tags(&["sport"])
        .depends_on(&["sport-selection"])
        .skippable()
        .then("sport-level")
        .seconds(30),
        StepDefinition::new("sport-level", InputKind::SingleChoice, "What level do you play at?")
            .title("Your level")
            .tags(&["sport"])
            .options(choices(&[
                ("beginner", "Beginner"),
                ("intermediate", "Intermediate"),
                ("advanced", "Advanced"),
            ]))
            .rule(ValidationRule::required("Please choose your level"))
            .then("season-period")
            .seconds(30),
        StepDefinition::new(
            "season-period",
            InputKind::SingleChoice,
            "Where are you in your season?",
        )
        .title("Season")
        .tags(&["sport"])
        .options(choices(&[
            ("off-season", "Off-season"),
            ("pre-season", "Pre-season"),
            ("in-season", "In season"),
            ("recovery", "Recovery"),
        ]))
        .skippable()
        .then("fitness-experience")
        .seconds(30),
        StepDefinition::new(
            "fitness-experience",
            InputKind::SingleChoice,
            "How much training experience do you have?",
        )
        .title("Experience")
        .tags(&["workout"])
        .options(choices(&[
            ("beginner", "Beginner (under 3 months)"),
            ("novice", "Novice (3 to 12 months)"),
            ("intermediate", "Intermediate (1 to 3 years)"),
            ("advanced", "Advanced (3 to 5 years)"),
            ("expert", "Expert (5+ years)"),
        ]))
        .rule(ValidationRule::required("Please tell us your experience"))
        .then("equipment-available")
        .seconds(30),
        StepDefinition::new(
            "equipment-available",
            InputKind::SingleChoice,
            "What equipment do you have access to?",
        )
        .title("Equipment")
        .tags(&["workout"])
        .options(choices(&[
            ("none", "No equipment"),
            ("minimal", "Bands and dumbbells"),
            ("home-gym", "Home gym"),
            ("full-gym", "Full gym"),
        ]))
        .skippable()
        .then("lifestyle-preferences")
        .seconds(30),
        StepDefinition::new(
            "lifestyle-preferences",
            InputKind::SingleChoice,
            "How active is your day-to-day life?",
        )
        .title("Lifestyle")
        .tags(&["wellness"])
        .options(choices(&[
            ("sedentary", "Sedentary"),
            ("lightly-active", "Lightly active"),
            ("moderately-active", "Moderately active"),
            ("very-active", "Very active"),
            ("extremely-active", "Extremely active"),
        ]))
        .rule(ValidationRule::required("Please describe your lifestyle"))
        .then("dietary-preferences")
        .seconds(30),
        StepDefinition::new(
            "dietary-preferences",
            InputKind::SingleChoice,
            "Do you follow a particular diet?",
        )
        .title("Diet")
        .tags(&["nutrition"])
        .options(choices(&[
            ("omnivore", "Omnivore"),
            ("vegetarian", "Vegetarian"),
            ("vegan", "Vegan"),
            ("pescatarian", "Pescatarian"),
            ("keto", "Keto"),
            ("paleo", "Paleo"),
            ("mediterranean", "Mediterranean"),
        ]))
        .skippable()
        .then("sleep-habits")
        .seconds(30),
        StepDefinition::new(
            "sleep-habits",
            InputKind::Slider,
            "How many hours do you sleep on an average night?",
        )
        .title("Sleep")
        .tags(&["sleep"])
        .rule(ValidationRule::required("Please tell us how much you sleep"))
        .rule(ValidationRule::min(3.0, "Please enter at least 3 hours"))
        .rule(ValidationRule::max(14.0, "Please enter at most 14 hours"))
        .then("training-availability")
        .seconds(20),
        StepDefinition::new(
            "training-availability",
            InputKind::SingleChoice,
            "How often can you train each week?",
        )
        .title("Availability")
        .tags(&["workout"])
        .options(choices(&[
            ("1-2-sessions", "1 to 2 sessions"),
            ("3-4-sessions", "3 to 4 sessions"),
            ("5-6-sessions", "5 to 6 sessions"),
            ("daily", "Every day"),
        ]))
        .rule(ValidationRule::required("Please choose your availability"))
        .then("nutrition-objectives")
        .seconds(30)
        .tip("Consistency beats intensity: three moderate sessions a week beat one hard one."),
        StepDefinition::new(
            "nutrition-objectives",
            InputKind::SingleChoice,
            "What is your nutrition goal?",
        )
        .title("Nutrition goal")
        .tags(&["nutrition"])
        .options(choices(&[
            ("weight-loss", "Weight loss"),
            ("muscle-gain", "Muscle gain"),
            ("maintenance", "Maintenance"),
            ("performance", "Performance"),
            ("health", "General health"),
        ]))
        .skippable()
        .then("personal-info")
        .seconds(30),
        StepDefinition::new("personal-info", InputKind::Form, "Tell us a little about yourself")
            .title("Personal information")
            .tags(&["identity"])
            .rule(ValidationRule::required("This information helps us tailor your plan"))
            .rule(ValidationRule::required("Your age is required").on_field("age"))
            .rule(ValidationRule::min(13.0, "You must be at least 13 years old").on_field("age"))
            .rule(ValidationRule::max(120.0, "Please enter a valid age").on_field("age"))
            .rule(ValidationRule::min(100.0, "Please enter a height in centimetres").on_field("height"))
            .rule(ValidationRule::max(250.0, "Please enter a height in centimetres").on_field("height"))
            .then("health-conditions")
            .seconds(60)
            .tip("Your personal data is kept private and never shared."),
        StepDefinition::new(
            "health-conditions",
            InputKind::MultiChoice,
            "Do you have any health conditions we should know about?",
        )
        .title("Health")
        .tags(&["wellness"])
        .options(choices(&[
            ("none", "None"),
            ("back-pain", "Back pain"),
            ("joint-issues", "Joint issues"),
            ("heart-condition", "Heart condition"),
            ("diabetes", "Diabetes"),
            ("asthma", "Asthma"),
            ("hypertension", "High blood pressure"),
        ]))
        .skippable()
        .then("notifications-preferences")
        .seconds(30),
        StepDefinition::new(
            "notifications-preferences",
            InputKind::Boolean,
            "Would you like reminders to keep you on track?",
        )
        .title("Notifications")
        .tags(&["settings"])
        .skippable()
        .then("completion")
        .seconds(15),
        StepDefinition::new(
            "completion",
            InputKind::Info,
            "Congratulations! You are ready to start your journey.",
        )
        .title("All set!")
        .next(NextStep::Terminal)
        .seconds(10),
    ])
}
