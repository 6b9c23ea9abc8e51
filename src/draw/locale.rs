//! Every piece of human language drawn on the image
//!
//! Defaults are Simplified Chinese. A deployment can replace any of them from the `locale`
//! config section.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Locale {
    /// Calendar header, Monday first
    pub weekday_headers: [String; 7],
    /// Weekday names used in the precipitation outlook, Monday first
    pub weekday_names: [String; 7],
    pub today: String,
    pub tomorrow: String,
    pub day_after_tomorrow: String,
    /// Put in front of weekday names once the outlook crosses into next week
    pub next_week_prefix: String,
    /// Appended to the day offset when no relative name is left, `5` + `天后`
    pub days_later_suffix: String,
    /// Joins a day label and the daytime condition
    pub has: String,
    /// Joins a day label and the night condition
    pub at_night: String,
    /// Outlook used when it is already wet today
    pub rain_today: String,
    /// Condition text fragments that count as precipitation
    pub precipitation_keywords: Vec<String>,
    pub no_schedule: String,
    /// First character of both stacked temperature labels
    pub extreme: String,
    pub lowest: String,
    pub highest: String,
}

impl Default for Locale {
    fn default() -> Self {
        let owned = |items: [&str; 7]| items.map(str::to_string);
        Self {
            weekday_headers: owned(["一", "二", "三", "四", "五", "六", "日"]),
            weekday_names: owned(["周一", "周二", "周三", "周四", "周五", "周六", "周日"]),
            today: "今天".to_string(),
            tomorrow: "明天".to_string(),
            day_after_tomorrow: "后天".to_string(),
            next_week_prefix: "下".to_string(),
            days_later_suffix: "天后".to_string(),
            has: "有".to_string(),
            at_night: "夜间".to_string(),
            rain_today: "今日有雨".to_string(),
            precipitation_keywords: ["雨", "雪", "雷", "雾"].map(str::to_string).to_vec(),
            no_schedule: "近日无日程".to_string(),
            extreme: "最".to_string(),
            lowest: "低".to_string(),
            highest: "高".to_string(),
        }
    }
}

/// How far ahead the outlook names days
pub const RELATIVE_LABEL_DAYS: u8 = 14;

impl Locale {
    /// Names for the days starting today, `today_weekday` is Monday = 1 .. Sunday = 7.
    ///
    /// After the first Monday weekday names get the next-week prefix. Labelling stops at the
    /// second Monday because the prefix would be wrong from there on.
    pub fn relative_day_labels(&self, today_weekday: u8) -> Vec<String> {
        let mut labels = Vec::with_capacity(usize::from(RELATIVE_LABEL_DAYS));
        let mut next_week = false;

        for offset in 0..RELATIVE_LABEL_DAYS {
            // 0 = Monday
            let weekday = (usize::from(today_weekday.saturating_sub(1)) + usize::from(offset)) % 7;
            if weekday == 0 && offset > 0 {
                if next_week {
                    break;
                }
                next_week = true;
            }

            let label = match offset {
                0 => self.today.clone(),
                1 => self.tomorrow.clone(),
                2 => self.day_after_tomorrow.clone(),
                _ if next_week => format!("{}{}", self.next_week_prefix, self.weekday_names[weekday]),
                _ => self.weekday_names[weekday].clone(),
            };
            labels.push(label);
        }
        labels
    }

    pub fn days_later(&self, offset: usize) -> String {
        format!("{offset}{}", self.days_later_suffix)
    }
}
