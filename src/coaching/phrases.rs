//! Fixed phrase tables. Every spoken message comes from here.

use rand::Rng;

use crate::exercise::ExerciseType;
use crate::form::FormErrorType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phrase {
    pub id: &'static str,
    pub text: &'static str,
}

const fn phrase(id: &'static str, text: &'static str) -> Phrase {
    Phrase { id, text }
}

pub const CHECK_FORM: Phrase = phrase("check_form", "Check your form");

/// Error types without an entry here fall back to [`CHECK_FORM`].
static CORRECTIVE: &[(FormErrorType, Phrase)] = &[
    (
        FormErrorType::PoseIncomplete,
        phrase("step_into_frame", "Step back so I can see your whole body"),
    ),
    (
        FormErrorType::ExcessiveDepth,
        phrase("not_too_low", "Don't drop too low, stop just above the floor"),
    ),
    (FormErrorType::ElbowFlare, phrase("tuck_elbows", "Tuck your elbows in")),
    (
        FormErrorType::BodyLineBreak,
        phrase("straight_body", "Keep your body in a straight line"),
    ),
    (FormErrorType::TorsoLean, phrase("stand_tall", "Stand up tall")),
    (
        FormErrorType::ShoulderTilt,
        phrase("level_shoulders", "Keep your shoulders level"),
    ),
    (FormErrorType::HipTilt, phrase("level_hips", "Keep your hips level")),
    (
        FormErrorType::ElbowAsymmetry,
        phrase("even_arms", "Push evenly with both arms"),
    ),
    (FormErrorType::BentArms, phrase("straighten_arms", "Straighten your arms")),
    (
        FormErrorType::UnevenArms,
        phrase("arms_together", "Raise both arms together"),
    ),
    (
        FormErrorType::StanceWidth,
        phrase("hip_width_stance", "Keep your feet about hip width apart"),
    ),
    (
        FormErrorType::UnevenLegs,
        phrase("even_feet", "Jump both feet out the same distance"),
    ),
];

pub fn corrective(error_type: FormErrorType) -> Phrase {
    lookup(CORRECTIVE, error_type)
}

fn lookup(table: &[(FormErrorType, Phrase)], error_type: FormErrorType) -> Phrase {
    table
        .iter()
        .find(|(ty, _)| *ty == error_type)
        .map(|(_, p)| *p)
        .unwrap_or(CHECK_FORM)
}

pub fn incomplete_rep(exercise: ExerciseType) -> Phrase {
    match exercise {
        ExerciseType::PushUp => phrase("go_lower", "Go a little lower"),
        ExerciseType::Marching => phrase("knees_higher", "Lift your knees higher"),
        ExerciseType::JumpingJack => phrase("jump_wider", "Jump wider and reach higher"),
    }
}

const MILESTONE_25: &[&str] = &["Quarter of the way there", "Good start, keep it going"];
const MILESTONE_50: &[&str] = &["Halfway there", "Half done, stay strong"];
const MILESTONE_75: &[&str] = &["Three quarters done", "Almost there, push through"];
const MILESTONE_100: &[&str] = &["Set complete, great work", "That's the target, well done"];

const STREAK_SHORT: &[&str] = &["{n} good reps in a row", "Nice form, {n} straight"];
const STREAK_LONG: &[&str] = &["{n} in a row, outstanding form", "{n} clean reps, you're on fire"];

/// Returns the message id and a randomly chosen variant for a milestone.
pub fn milestone<R: Rng>(percent: u32, rng: &mut R) -> (String, String) {
    let variants = match percent {
        0..=25 => MILESTONE_25,
        26..=50 => MILESTONE_50,
        51..=75 => MILESTONE_75,
        _ => MILESTONE_100,
    };
    (format!("milestone_{percent}"), pick(variants, rng).to_string())
}

/// Streaks of ten or more get their own wording.
pub fn streak<R: Rng>(length: u32, rng: &mut R) -> (String, String) {
    let (id, variants) = if length >= 10 {
        ("streak_long", STREAK_LONG)
    } else {
        ("streak", STREAK_SHORT)
    };
    let text = pick(variants, rng).replace("{n}", &length.to_string());
    (id.to_string(), text)
}

fn pick<R: Rng>(variants: &[&'static str], rng: &mut R) -> &'static str {
    variants[rng.gen_range(0..variants.len())]
}
