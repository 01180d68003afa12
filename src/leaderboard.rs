use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Movement {
    Up,
    Down,
    Same,
    New,
}

impl Movement {
    pub fn as_str(self) -> &'static str {
        match self {
            Movement::Up => "up",
            Movement::Down => "down",
            Movement::Same => "same",
            Movement::New => "new",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Movement::Up),
            "down" => Some(Movement::Down),
            "same" => Some(Movement::Same),
            "new" => Some(Movement::New),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub name: String,
    pub score: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub name: String,
    pub score: u8,
    pub movement: Movement,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub rank: u32,
    pub total: u32,
    pub score: u8,
}

/// Orders participants by green score (highest first, ties by name) with competition
/// ranking: equal scores share a rank and the following rank is skipped.
pub fn rank_entries(
    mut entries: Vec<ScoreEntry>,
    previous: Option<&[LeaderboardEntry]>,
) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));

    let previous_ranks: HashMap<&str, u32> = previous
        .unwrap_or_default()
        .iter()
        .map(|entry| (entry.name.as_str(), entry.rank))
        .collect();

    let mut board = Vec::with_capacity(entries.len());
    let mut rank = 0u32;
    let mut last_score = None;
    for (position, entry) in entries.into_iter().enumerate() {
        if last_score != Some(entry.score) {
            rank = position as u32 + 1;
            last_score = Some(entry.score);
        }

        let movement = match previous_ranks.get(entry.name.as_str()) {
            None => Movement::New,
            Some(prev) if *prev > rank => Movement::Up,
            Some(prev) if *prev < rank => Movement::Down,
            Some(_) => Movement::Same,
        };

        board.push(LeaderboardEntry {
            rank,
            name: entry.name,
            score: entry.score,
            movement,
        });
    }
    board
}

pub fn standing(board: &[LeaderboardEntry], name: &str) -> Option<Standing> {
    board
        .iter()
        .find(|entry| entry.name == name)
        .map(|entry| Standing {
            rank: entry.rank,
            total: board.len() as u32,
            score: entry.score,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, score: u8) -> ScoreEntry {
        ScoreEntry {
            name: name.into(),
            score,
        }
    }

    #[test]
    fn orders_by_score_then_name() {
        let board = rank_entries(
            vec![
                entry("Green Co", 92),
                entry("EarthFirst Trading", 85),
                entry("EcoVendors Ltd", 95),
            ],
            None,
        );
        let names: Vec<&str> = board.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["EcoVendors Ltd", "Green Co", "EarthFirst Trading"]);
        assert_eq!(board[0].rank, 1);
        assert!(board.iter().all(|e| e.movement == Movement::New));
    }

    #[test]
    fn ties_share_a_rank_and_skip_the_next() {
        let board = rank_entries(
            vec![entry("b", 88), entry("a", 88), entry("c", 70), entry("d", 95)],
            None,
        );
        let ranks: Vec<(u32, &str)> = board.iter().map(|e| (e.rank, e.name.as_str())).collect();
        assert_eq!(ranks, [(1, "d"), (2, "a"), (2, "b"), (4, "c")]);
    }

    #[test]
    fn movement_is_relative_to_previous_board() {
        let before = rank_entries(vec![entry("a", 90), entry("b", 80), entry("c", 70)], None);
        let after = rank_entries(
            vec![entry("a", 75), entry("b", 85), entry("c", 70), entry("d", 60)],
            Some(&before),
        );
        let moves: Vec<(&str, Movement)> =
            after.iter().map(|e| (e.name.as_str(), e.movement)).collect();
        assert_eq!(
            moves,
            [
                ("b", Movement::Up),
                ("a", Movement::Down),
                ("c", Movement::Same),
                ("d", Movement::New),
            ]
        );
    }

    #[test]
    fn standing_reports_rank_out_of_total() {
        let board = rank_entries(vec![entry("a", 90), entry("b", 80)], None);
        assert_eq!(
            standing(&board, "b"),
            Some(Standing {
                rank: 2,
                total: 2,
                score: 80
            })
        );
        assert_eq!(standing(&board, "zz"), None);
    }
}
