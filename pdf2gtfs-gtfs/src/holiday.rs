//! Holiday projection (§4.7) and the interactive annotation-exception
//! flow `original_source/.../user_input/cli.py::handle_annotations`
//! asks about, represented as a trait seam per `SPEC_FULL.md`'s CLI
//! surface section: the interactive terminal UI is out of scope (§1),
//! the hook it plugs into is not.

use chrono::NaiveDate;

use crate::model::ExceptionType;

/// asks the operator about calendar details the engine itself cannot
/// infer. The `pdf2gtfs` binary supplies an interactive implementation;
/// library code only depends on this trait.
pub trait UserPrompt {
    /// for an `EntryAnnotValue` not already mapped to a known meaning,
    /// ask whether it marks dates where service differs from the
    /// entry's default calendar. `None` means "skip this annotation".
    fn ask_annotation_exception(&self, annotation: &str) -> Option<(ExceptionType, Vec<NaiveDate>)>;
}

/// default implementation matching spec.md §6's `non_interactive`
/// flag: every annotation resolves to "skip".
pub struct NonInteractivePrompt;

impl UserPrompt for NonInteractivePrompt {
    fn ask_annotation_exception(&self, _annotation: &str) -> Option<(ExceptionType, Vec<NaiveDate>)> {
        None
    }
}

/// resolves an entry's annotation tokens into calendar-date exceptions
/// via `prompt`, per `original_source`'s `handle_annotations`.
pub struct AnnotationExceptionResolver;

impl AnnotationExceptionResolver {
    pub fn resolve(
        annotations: &[String],
        prompt: &dyn UserPrompt,
    ) -> Vec<(String, ExceptionType, Vec<NaiveDate>)> {
        annotations
            .iter()
            .filter_map(|a| prompt.ask_annotation_exception(a).map(|(kind, dates)| (a.clone(), kind, dates)))
            .collect()
    }
}

/// supplies the calendar dates §4.7's holiday projection needs. Real
/// holiday computation (Easter-relative observances, regional
/// subdivisions) is itself an external collaborator the spec doesn't
/// name; this ships a small fixed-date table good enough to exercise
/// the projection hook, not a complete holiday engine.
pub trait HolidayCalendar {
    fn is_holiday(&self, date: NaiveDate) -> bool;
}

/// fixed month/day public holidays for a handful of ISO country codes.
/// Deliberately does not model moveable feasts (Easter, Pentecost) —
/// see `DESIGN.md` for the scope decision.
pub struct FixedHolidayCalendar {
    month_days: Vec<(u32, u32)>,
}

impl FixedHolidayCalendar {
    pub fn for_country_code(code: &str) -> Option<FixedHolidayCalendar> {
        let month_days = match code.to_ascii_uppercase().as_str() {
            "DE" => vec![(1, 1), (5, 1), (10, 3), (12, 25), (12, 26)],
            "AT" => vec![(1, 1), (5, 1), (10, 26), (12, 25), (12, 26)],
            "CH" => vec![(1, 1), (8, 1), (12, 25)],
            _ => return None,
        };
        Some(FixedHolidayCalendar { month_days })
    }
}

impl HolidayCalendar for FixedHolidayCalendar {
    fn is_holiday(&self, date: NaiveDate) -> bool {
        use chrono::Datelike;
        self.month_days.contains(&(date.month(), date.day()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_interactive_prompt_skips_every_annotation() {
        let prompt = NonInteractivePrompt;
        let resolved = AnnotationExceptionResolver::resolve(&["X".to_string()], &prompt);
        assert!(resolved.is_empty());
    }

    #[test]
    fn fixed_holiday_calendar_recognizes_configured_dates() {
        let cal = FixedHolidayCalendar::for_country_code("DE").unwrap();
        assert!(cal.is_holiday(NaiveDate::from_ymd_opt(2026, 12, 25).unwrap()));
        assert!(!cal.is_holiday(NaiveDate::from_ymd_opt(2026, 3, 17).unwrap()));
    }

    #[test]
    fn unknown_country_code_yields_no_calendar() {
        assert!(FixedHolidayCalendar::for_country_code("ZZ").is_none());
    }
}
