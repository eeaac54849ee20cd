//! Maps wttr.in / WWO condition codes to display icon categories.
//! See: https://www.worldweatheronline.com/weather-api/api/docs/weather-icons.aspx

use crate::model::ConditionIcon;

const CLEAR: &[i64] = &[113];
const PARTLY_CLOUDY: &[i64] = &[116, 119, 122];
const FOG: &[i64] = &[143, 248, 260];
const RAIN: &[i64] = &[
    176, 200, 263, 266, 281, 284, 293, 296, 299, 302, 305, 308, 311, 314, 353, 356, 359, 386, 389,
];
const SNOW: &[i64] = &[
    179, 227, 230, 317, 320, 323, 326, 329, 332, 335, 338, 350, 368, 371, 374, 377, 392, 395,
];

/// Every known code group with the category it maps to.
pub const GROUPS: &[(ConditionIcon, &[i64])] = &[
    (ConditionIcon::Clear, CLEAR),
    (ConditionIcon::PartlyCloudy, PARTLY_CLOUDY),
    (ConditionIcon::Fog, FOG),
    (ConditionIcon::Rain, RAIN),
    (ConditionIcon::Snow, SNOW),
];

/// Total: unknown codes map to [`ConditionIcon::Other`].
pub fn map_code(code: i64) -> ConditionIcon {
    GROUPS
        .iter()
        .find(|(_, codes)| codes.contains(&code))
        .map(|(icon, _)| *icon)
        .unwrap_or(ConditionIcon::Other)
}
