//! The six-step scent preference quiz.

use log::{ error, info };

use crate::api::PerfApi;
use crate::error::QuizError;
use crate::models::preferences::{ Longevity, ScentProfile, Sillage };

pub const TOTAL_STEPS: u8 = 6;

pub const VIBES: &[(&str, &str)] = &[
    ("energizing", "Energizing & Fresh"),
    ("alluring", "Alluring & Mysterious"),
    ("cozy", "Cozy & Comforting"),
    ("elegant", "Elegant & Sophisticated"),
];

pub const SCENES: &[(&str, &str)] = &[
    ("coastal", "A Coastal Escape"),
    ("library", "A Quiet, Warm Room"),
    ("garden", "A Lush Garden"),
    ("bakery", "A Sweet Indulgence"),
];

pub const ELEMENTS: &[(&str, &str)] = &[
    ("citrus", "Fresh fruits"),
    ("floral", "Fresh bouquet"),
    ("spicy", "Spices & woods"),
    ("gourmand", "Vanilla & sugar"),
    ("aquatic", "Ocean air"),
    ("green", "Leaves & stems"),
    ("smoky", "Incense & smoke"),
];

#[derive(Debug, Clone)]
pub struct ScentQuiz {
    step: u8,
    answers: ScentProfile,
    is_submitting: bool,
}

impl Default for ScentQuiz {
    fn default() -> Self {
        Self::new()
    }
}

impl ScentQuiz {
    pub fn new() -> Self {
        Self {
            step: 1,
            answers: ScentProfile {
                sillage: Some(Sillage::default()),
                longevity: Some(Longevity::default()),
                ..ScentProfile::default()
            },
            is_submitting: false,
        }
    }

    /// Starts over from step 1 with previously saved answers filled in.
    pub fn initialize(&mut self, saved: ScentProfile) {
        let mut quiz = Self::new();
        quiz.answers = ScentProfile {
            sillage: saved.sillage.or(quiz.answers.sillage),
            longevity: saved.longevity.or(quiz.answers.longevity),
            ..saved
        };
        *self = quiz;
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn answers(&self) -> &ScentProfile {
        &self.answers
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    /// Percentage of the way through, 0 on the first step and 100 on the last.
    pub fn progress(&self) -> f32 {
        f32::from(self.step - 1) / f32::from(TOTAL_STEPS - 1) * 100.0
    }

    pub fn set_vibe(&mut self, vibe: &str) {
        self.answers.vibe = vibe.to_string();
    }

    pub fn set_scene(&mut self, scene: &str) {
        self.answers.scene = scene.to_string();
    }

    pub fn toggle_element(&mut self, element: &str) {
        let elements = &mut self.answers.elements;
        match elements.iter().position(|e| e == element) {
            Some(index) => {
                elements.remove(index);
            }
            None => elements.push(element.to_string()),
        }
    }

    pub fn set_loved(&mut self, text: &str) {
        self.answers.loved = non_empty(text);
    }

    pub fn set_disliked(&mut self, text: &str) {
        self.answers.disliked = non_empty(text);
    }

    pub fn set_sillage(&mut self, sillage: Sillage) {
        self.answers.sillage = Some(sillage);
    }

    pub fn set_longevity(&mut self, longevity: Longevity) {
        self.answers.longevity = Some(longevity);
    }

    pub fn set_additional(&mut self, text: &str) {
        self.answers.additional = non_empty(text);
    }

    /// Whether the current step has what it needs to move on.
    pub fn can_advance(&self) -> bool {
        match self.step {
            1 => !self.answers.vibe.is_empty(),
            2 => !self.answers.scene.is_empty(),
            3 => !self.answers.elements.is_empty(),
            s => s < TOTAL_STEPS,
        }
    }

    pub fn next(&mut self) -> Result<u8, QuizError> {
        if !self.can_advance() {
            return Err(QuizError::Incomplete(self.step));
        }
        self.step += 1;
        Ok(self.step)
    }

    pub fn back(&mut self) -> u8 {
        if self.step > 1 {
            self.step -= 1;
        }
        self.step
    }

    /// Saves the answers for `user_id`. The quiz keeps its state either way so
    /// a failed save can be retried.
    pub async fn submit(&mut self, api: &dyn PerfApi, user_id: &str) -> Result<ScentProfile, QuizError> {
        self.is_submitting = true;
        let result = api.save_scent_profile(user_id, &self.answers).await;
        self.is_submitting = false;

        match result {
            Ok(()) => {
                info!("Scent profile saved for {}", user_id);
                Ok(self.answers.clone())
            }
            Err(e) => {
                error!("Could not save scent profile for {}: {}", user_id, e);
                Err(e.into())
            }
        }
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}
