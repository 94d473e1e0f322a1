mod lenient;

pub mod account;
pub mod alerts;
pub mod reading;
pub mod statistics;

pub use account::AccountData;
pub use alerts::{AlertCommand, AlertSettings, AlertSettingsError};
pub use reading::{parse_reading_date, DailyReading, Measure, MonthlyReading};
pub use statistics::{
    MeanType, StatisticMetadata, StatisticPoint, StatisticsImport, UNIT_CUBIC_METERS, UNIT_LITERS,
};
