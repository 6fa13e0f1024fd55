//! Preset prompts offered on the start screen and under the history.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use strum::{EnumIter, IntoEnumIterator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum QuickAction {
    TopAttractions,
    PlanItinerary,
    BudgetHotels,
    BestTime,
}

impl QuickAction {
    pub fn label(self) -> &'static str {
        match self {
            QuickAction::TopAttractions => "Top Attractions",
            QuickAction::PlanItinerary => "Plan Itinerary",
            QuickAction::BudgetHotels => "Budget Hotels",
            QuickAction::BestTime => "Best Time",
        }
    }

    /// Message sent when the action is chosen
    pub fn query(self) -> &'static str {
        match self {
            QuickAction::TopAttractions => "What are the top tourist attractions in Paris?",
            QuickAction::PlanItinerary => "Suggest a 5-day itinerary for Tokyo",
            QuickAction::BudgetHotels => "Find budget-friendly hotels in Barcelona",
            QuickAction::BestTime => "When is the best time to visit Bali?",
        }
    }

    /// Function key number bound to this action (F1..F4)
    pub fn key_number(self) -> u8 {
        match self {
            QuickAction::TopAttractions => 1,
            QuickAction::PlanItinerary => 2,
            QuickAction::BudgetHotels => 3,
            QuickAction::BestTime => 4,
        }
    }

    pub fn from_key_number(number: u8) -> Option<Self> {
        QuickAction::iter().find(|action| action.key_number() == number)
    }
}

/// One-line strip of the actions; dimmed while a reply is loading
pub fn quick_actions_line(disabled: bool) -> Line<'static> {
    let (key_style, label_style) = if disabled {
        let dim = Style::default().fg(Color::DarkGray);
        (dim, dim)
    } else {
        (
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            Style::default().fg(Color::White),
        )
    };

    let mut spans = Vec::new();
    for (i, action) in QuickAction::iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("   "));
        }
        spans.push(Span::styled(format!("F{}", action.key_number()), key_style));
        spans.push(Span::styled(format!(" {}", action.label()), label_style));
    }
    Line::from(spans)
}
