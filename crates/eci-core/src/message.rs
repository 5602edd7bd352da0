//! Notification parsing: `"<TYPE><number?>"` (spec §6), grounded in
//! `original_source/elitecloud_alarm/types.py::AlarmMessage`.

/// An unsolicited message from the panel: a non-digit type prefix followed
/// by an optional all-digit number (`"ZO3"` -> `{type: "ZO", number: 3}`,
/// `"CAL"` -> `{type: "CAL", number: None}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmMessage {
    pub message_type: String,
    pub number: Option<u32>,
}

impl AlarmMessage {
    pub fn parse(message: &str) -> Self {
        let message = message.trim();
        let digit_start = message
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit())
            .map(|(idx, _)| idx);

        match digit_start {
            Some(idx) => {
                let (prefix, suffix) = message.split_at(idx);
                let number = suffix.parse::<u32>().ok();
                Self {
                    message_type: prefix.to_string(),
                    number,
                }
            }
            None => Self {
                message_type: message.to_string(),
                number: None,
            },
        }
    }

    pub fn is_type(&self, ty: &str) -> bool {
        self.message_type == ty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_prefix_and_number() {
        let m = AlarmMessage::parse("ZO3");
        assert_eq!(m.message_type, "ZO");
        assert_eq!(m.number, Some(3));
    }

    #[test]
    fn handles_no_number() {
        let m = AlarmMessage::parse("CAL");
        assert_eq!(m.message_type, "CAL");
        assert_eq!(m.number, None);
    }

    #[test]
    fn no_digits_at_all_leaves_number_none() {
        let m = AlarmMessage::parse("RO");
        assert_eq!(m.message_type, "RO");
        assert_eq!(m.number, None);
    }

    #[test]
    fn area_message_parses_area_number() {
        let m = AlarmMessage::parse("A1");
        assert_eq!(m.message_type, "A");
        assert_eq!(m.number, Some(1));
    }
}
