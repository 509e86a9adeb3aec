//! Built-in prompt catalog.

use crate::domain::{Prompt, PromptSource, RaceId};

const CATALOG: &[&str] = &[
    "The quick brown fox jumps over the lazy dog while the farmer watches from the porch.",
    "Programs must be written for people to read, and only incidentally for machines to execute.",
    "A journey of a thousand miles begins with a single step taken in the right direction.",
    "Simplicity is prerequisite for reliability, and reliability is the price of trust.",
    "The best way to predict the future is to invent it, one small experiment at a time.",
    "Typing quickly is easy; typing quickly without mistakes takes patience and practice.",
    "Rivers know this: there is no hurry. We shall get there some day, said the bear.",
    "Measure twice and cut once, because the saw does not care about your good intentions.",
];

/// FNV-1a, stable across processes and releases
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

/// Picks a catalog entry from the race id, so the id doubles as the text seed.
#[derive(Debug, Clone)]
pub struct BuiltinPromptCatalog {
    prompts: Vec<Prompt>,
}

impl BuiltinPromptCatalog {
    pub fn new() -> Self {
        let prompts = CATALOG
            .iter()
            .filter_map(|text| Prompt::new((*text).to_string()).ok())
            .collect();
        Self { prompts }
    }
}

impl Default for BuiltinPromptCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptSource for BuiltinPromptCatalog {
    fn prompt_for(&self, race_id: &RaceId) -> Prompt {
        let index = usize::try_from(fnv1a(race_id.as_str().as_bytes()) % self.prompts.len() as u64)
            .unwrap_or_default();
        self.prompts[index].clone()
    }
}

/// Same prompt for every race
#[derive(Debug, Clone)]
pub struct StaticPromptSource {
    prompt: Prompt,
}

impl StaticPromptSource {
    pub fn new(prompt: Prompt) -> Self {
        Self { prompt }
    }
}

impl PromptSource for StaticPromptSource {
    fn prompt_for(&self, _race_id: &RaceId) -> Prompt {
        self.prompt.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn race(id: &str) -> RaceId {
        RaceId::new(id.to_string()).unwrap()
    }

    #[test]
    fn test_catalog_prompt_is_stable_per_race() {
        // テスト項目: 同じ race id には常に同じプロンプトが選ばれる
        let a = BuiltinPromptCatalog::new();
        let b = BuiltinPromptCatalog::new();
        for id in ["race-1", "race-2", "tournament_final"] {
            assert_eq!(a.prompt_for(&race(id)), b.prompt_for(&race(id)));
        }
    }

    #[test]
    fn test_catalog_spreads_races_over_prompts() {
        // テスト項目: 異なる race id で複数のプロンプトが使われる
        let catalog = BuiltinPromptCatalog::new();
        let distinct: std::collections::HashSet<String> = (0..32)
            .map(|i| catalog.prompt_for(&race(&format!("race-{}", i))).text().to_string())
            .collect();
        assert!(distinct.len() > 1);
    }
}
