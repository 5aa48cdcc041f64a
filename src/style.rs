//! Badge tones. Every mapping is total: unknown values fall back to gray.

use crate::types::{
    BattleCardStatus, Confidence, DealStage, EntityType, GenerationStatus, Role, SignalStatus,
    ThreatLevel,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Gray,
}

impl Tone {
    pub fn ansi(&self) -> &'static str {
        match self {
            Tone::Red => "\x1b[31m",
            Tone::Orange => "\x1b[38;5;208m",
            Tone::Yellow => "\x1b[33m",
            Tone::Green => "\x1b[32m",
            Tone::Blue => "\x1b[34m",
            Tone::Purple => "\x1b[35m",
            Tone::Gray => "\x1b[90m",
        }
    }

    pub fn hex(&self) -> &'static str {
        match self {
            Tone::Red => "#ef4444",
            Tone::Orange => "#f97316",
            Tone::Yellow => "#eab308",
            Tone::Green => "#22c55e",
            Tone::Blue => "#3b82f6",
            Tone::Purple => "#a855f7",
            Tone::Gray => "#6b7280",
        }
    }
}

const RESET: &str = "\x1b[0m";

/// `[text]`, colored when `color` is on.
pub fn badge(text: &str, tone: Tone, color: bool) -> String {
    if color {
        format!("{}[{}]{}", tone.ansi(), text, RESET)
    } else {
        format!("[{}]", text)
    }
}

pub fn paint(text: &str, tone: Tone, color: bool) -> String {
    if color {
        format!("{}{}{}", tone.ansi(), text, RESET)
    } else {
        text.to_string()
    }
}

pub fn threat_tone(level: ThreatLevel) -> Tone {
    match level {
        ThreatLevel::Critical => Tone::Red,
        ThreatLevel::High => Tone::Orange,
        ThreatLevel::Medium => Tone::Yellow,
        ThreatLevel::Low => Tone::Green,
        ThreatLevel::Monitor => Tone::Gray,
        ThreatLevel::Unknown => Tone::Gray,
    }
}

pub fn entity_type_tone(kind: EntityType) -> Tone {
    match kind {
        EntityType::Competitor => Tone::Red,
        EntityType::Target => Tone::Blue,
        EntityType::Partner => Tone::Green,
        EntityType::Unknown => Tone::Gray,
    }
}

pub fn stage_tone(stage: DealStage) -> Tone {
    match stage {
        DealStage::Prospecting => Tone::Gray,
        DealStage::Discovery => Tone::Blue,
        DealStage::Eval => Tone::Purple,
        DealStage::Negotiation => Tone::Orange,
        DealStage::ClosedWon => Tone::Green,
        DealStage::ClosedLost => Tone::Red,
        DealStage::Unknown => Tone::Gray,
    }
}

pub fn confidence_tone(confidence: Confidence) -> Tone {
    match confidence {
        Confidence::High => Tone::Green,
        Confidence::Medium => Tone::Yellow,
        Confidence::Low => Tone::Red,
        Confidence::Unknown => Tone::Gray,
    }
}

pub fn signal_status_tone(status: SignalStatus) -> Tone {
    match status {
        SignalStatus::New => Tone::Blue,
        SignalStatus::Reviewed => Tone::Green,
        SignalStatus::Archived | SignalStatus::Unknown => Tone::Gray,
    }
}

pub fn generation_tone(status: GenerationStatus) -> Tone {
    match status {
        GenerationStatus::Pending | GenerationStatus::InProgress => Tone::Yellow,
        GenerationStatus::Completed => Tone::Green,
        GenerationStatus::Failed => Tone::Red,
        GenerationStatus::Unknown => Tone::Gray,
    }
}

pub fn battle_card_tone(status: BattleCardStatus) -> Tone {
    match status {
        BattleCardStatus::Draft => Tone::Yellow,
        BattleCardStatus::Approved => Tone::Green,
        BattleCardStatus::Unknown => Tone::Gray,
    }
}

pub fn role_tone(role: Role) -> Tone {
    match role {
        Role::Admin => Tone::Red,
        Role::Analyst => Tone::Blue,
        Role::Sales => Tone::Green,
        Role::Viewer | Role::Unknown => Tone::Gray,
    }
}

/// Relationship to us of a tracked person (free-form on the wire).
pub fn relationship_tone(relationship: &str) -> Tone {
    match relationship {
        "ally" => Tone::Green,
        "hostile" => Tone::Red,
        "neutral" => Tone::Yellow,
        _ => Tone::Gray,
    }
}

/// Signal type (free-form on the wire).
pub fn signal_type_tone(signal_type: &str) -> Tone {
    match signal_type {
        "product_launch" => Tone::Blue,
        "exec_change" => Tone::Purple,
        "funding" | "customer_win" | "partnership" => Tone::Green,
        "deal_alert" => Tone::Orange,
        "email_mention" | "hiring" => Tone::Yellow,
        _ => Tone::Gray,
    }
}

/// Signal score: ≥80 red, ≥60 orange, ≥40 yellow, otherwise gray.
pub fn score_tone(score: u8) -> Tone {
    match score {
        80.. => Tone::Red,
        60..=79 => Tone::Orange,
        40..=59 => Tone::Yellow,
        _ => Tone::Gray,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_tone_thresholds() {
        assert_eq!(score_tone(100), Tone::Red);
        assert_eq!(score_tone(80), Tone::Red);
        assert_eq!(score_tone(79), Tone::Orange);
        assert_eq!(score_tone(60), Tone::Orange);
        assert_eq!(score_tone(59), Tone::Yellow);
        assert_eq!(score_tone(40), Tone::Yellow);
        assert_eq!(score_tone(39), Tone::Gray);
        assert_eq!(score_tone(0), Tone::Gray);
    }

    #[test]
    fn test_unknown_values_are_gray() {
        assert_eq!(threat_tone(ThreatLevel::parse("extreme")), Tone::Gray);
        assert_eq!(stage_tone(DealStage::parse("lost?")), Tone::Gray);
        assert_eq!(relationship_tone("frenemy"), Tone::Gray);
    }

    #[test]
    fn test_badge_plain_and_colored() {
        assert_eq!(badge("critical", Tone::Red, false), "[critical]");
        let colored = badge("critical", Tone::Red, true);
        assert!(colored.starts_with("\x1b[31m"));
        assert!(colored.ends_with("\x1b[0m"));
    }
}
