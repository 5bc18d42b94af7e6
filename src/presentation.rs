//! Derived display values for an analysis result.
//!
//! Nothing here is stored in the session; every value is recomputed from the
//! current [`AnalysisResult`] each time the window renders.

use crate::models::{AnalysisResult, PriceValue, Prediction, Strength};

pub const NO_PATTERNS_TEXT: &str = "No specific patterns detected";
pub const NO_RESISTANCE_TEXT: &str = "No resistance levels detected";
pub const NO_SUPPORT_TEXT: &str = "No support levels detected";

/// Bar sides narrower than this many percent are drawn without a label
pub const LABEL_MIN_WIDTH: u8 = 15;

/// Split of the bullish/bearish bar. The two widths always add up to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrengthBar {
    pub green_width: u8,
    pub red_width: u8,
}

impl StrengthBar {
    pub fn new(prediction: Prediction, strength: Strength) -> Self {
        let strength = strength.value();
        let green_width = match prediction {
            Prediction::Up => strength,
            Prediction::Down => Strength::MAX - strength,
        };

        Self {
            green_width,
            red_width: Strength::MAX - green_width,
        }
    }

    pub fn show_green_label(&self) -> bool {
        self.green_width > LABEL_MIN_WIDTH
    }

    pub fn show_red_label(&self) -> bool {
        self.red_width > LABEL_MIN_WIDTH
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    Strong,
    Moderate,
    Weak,
}

impl Confidence {
    /// Strong above 75, moderate above 50, weak otherwise
    pub fn from_strength(strength: Strength) -> Self {
        match strength.value() {
            76.. => Confidence::Strong,
            51.. => Confidence::Moderate,
            _ => Confidence::Weak,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Confidence::Strong => "Strong",
            Confidence::Moderate => "Moderate",
            Confidence::Weak => "Weak",
        }
    }
}

/// Non-empty lines of a newline-delimited text block
pub fn paragraphs(text: &str) -> Vec<String> {
    text.split('\n')
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

pub fn format_price(price: &PriceValue) -> String {
    match price {
        PriceValue::Number(value) => format!("${}", value),
        PriceValue::Text(text) => text.clone(),
    }
}

pub fn format_current_price(price: f64) -> String {
    format!("${:.2}", price)
}

fn format_levels(levels: &[f64], empty_text: &str) -> Vec<String> {
    if levels.is_empty() {
        vec![empty_text.to_string()]
    } else {
        levels.iter().map(|level| format!("${}", level)).collect()
    }
}

/// Everything the result card displays, as plain strings
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub headline: String,
    pub strength: u8,
    pub confidence: String,
    pub bar: StrengthBar,
    pub current_price: String,
    pub timeframe: String,
    pub stop_loss: String,
    pub take_profit: String,
    pub risk_reward: String,
    pub patterns: Vec<String>,
    pub resistance: Vec<String>,
    pub support: Vec<String>,
    pub analysis: Vec<String>,
    pub trading_setup: Vec<String>,
}

impl ResultView {
    pub fn from_result(result: &AnalysisResult) -> Self {
        let patterns = if result.patterns.is_empty() {
            vec![NO_PATTERNS_TEXT.to_string()]
        } else {
            result.patterns.clone()
        };

        Self {
            headline: result.prediction.headline().to_string(),
            strength: result.strength.value(),
            confidence: Confidence::from_strength(result.strength).label().to_string(),
            bar: StrengthBar::new(result.prediction, result.strength),
            current_price: format_current_price(result.current_price),
            timeframe: result.timeframe.clone(),
            stop_loss: format_price(&result.stop_loss),
            take_profit: format_price(&result.take_profit),
            risk_reward: result.risk_reward.clone(),
            patterns,
            resistance: format_levels(result.resistance_levels(), NO_RESISTANCE_TEXT),
            support: format_levels(result.support_levels(), NO_SUPPORT_TEXT),
            analysis: paragraphs(&result.analysis),
            trading_setup: paragraphs(&result.trading_setup),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn strength(value: u8) -> Strength {
        Strength::new(value).unwrap()
    }

    #[test]
    fn test_strong_bullish() {
        let bar = StrengthBar::new(Prediction::Up, strength(80));
        assert_eq!(bar.green_width, 80);
        assert_eq!(bar.red_width, 20);
        assert_eq!(Confidence::from_strength(strength(80)), Confidence::Strong);
    }

    #[test]
    fn test_moderate_bearish() {
        let bar = StrengthBar::new(Prediction::Down, strength(60));
        assert_eq!(bar.green_width, 40);
        assert_eq!(bar.red_width, 60);
        assert_eq!(Confidence::from_strength(strength(60)).label(), "Moderate");
    }

    #[test]
    fn test_weak() {
        assert_eq!(Confidence::from_strength(strength(30)), Confidence::Weak);
    }

    #[test]
    fn test_thresholds_are_exclusive() {
        assert_eq!(Confidence::from_strength(strength(76)), Confidence::Strong);
        assert_eq!(Confidence::from_strength(strength(75)), Confidence::Moderate);
        assert_eq!(Confidence::from_strength(strength(51)), Confidence::Moderate);
        assert_eq!(Confidence::from_strength(strength(50)), Confidence::Weak);
    }

    #[test]
    fn test_narrow_side_has_no_label() {
        let bar = StrengthBar::new(Prediction::Up, strength(90));
        assert!(bar.show_green_label());
        assert!(!bar.show_red_label());

        let bar = StrengthBar::new(Prediction::Down, strength(85));
        assert!(!bar.show_green_label());
        assert!(bar.show_red_label());
    }

    #[test]
    fn test_paragraphs_split_on_newlines() {
        assert_eq!(
            paragraphs("TREND: UPTREND\n\nMomentum building\n"),
            vec!["TREND: UPTREND", "Momentum building"]
        );
        assert!(paragraphs("").is_empty());
    }

    #[test]
    fn test_price_formatting() {
        assert_eq!(format_price(&PriceValue::Number(98.25)), "$98.25");
        assert_eq!(format_price(&PriceValue::Text("N/A".to_string())), "N/A");
        assert_eq!(format_current_price(101.5), "$101.50");
    }

    #[test]
    fn test_result_view_empty_states() {
        let result: AnalysisResult = serde_json::from_value(serde_json::json!({
            "prediction": "DOWN",
            "strength": 55,
            "stopLoss": "N/A",
            "takeProfit": "N/A",
            "riskReward": "N/A",
            "currentPrice": 0,
            "timeframe": "Unknown",
            "patterns": [],
            "analysis": "Could not extract candles",
            "tradingSetup": ""
        }))
        .unwrap();

        let view = ResultView::from_result(&result);
        assert_eq!(view.headline, "BEARISH");
        assert_eq!(view.confidence, "Moderate");
        assert_eq!(view.current_price, "$0.00");
        assert_eq!(view.patterns, vec![NO_PATTERNS_TEXT]);
        assert_eq!(view.resistance, vec![NO_RESISTANCE_TEXT]);
        assert_eq!(view.support, vec![NO_SUPPORT_TEXT]);
        assert!(view.trading_setup.is_empty());
    }

    proptest! {
        #[test]
        fn prop_bar_widths_sum_to_hundred(value in 0u8..=100, up in any::<bool>()) {
            let prediction = if up { Prediction::Up } else { Prediction::Down };
            let bar = StrengthBar::new(prediction, strength(value));
            prop_assert_eq!(bar.green_width as u16 + bar.red_width as u16, 100);
        }
    }
}
