//! Structured screening criteria for the default condition template
//!
//! [`ScreeningCriteria`] holds the numeric knobs of the long-form morning
//! condition and turns them into [`Variables`] for
//! [`DEFAULT_CONDITION_TEMPLATE`], doing the unit conversions the condition
//! text expects (percent, 万, 亿) and deriving the intermediate snapshot times.

use crate::{PromptError, Result, TargetDate, Variables};
use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

/// Named-placeholder form of the long morning condition
pub const DEFAULT_CONDITION_TEMPLATE: &str = "{target_date}{start_time}至{end_time}特大单净额排名行业前{large_order_ranking}或{target_date}{start_time}至{end_time}特大单净额排名行业前{large_order_alt_ranking}%；{target_date}竞价分时涨跌幅大于{bid_amp_min}小于{bid_amp_max}；{target_date}{start_time}至{end_time}均价/开盘价大于{avg_price_ratio_min}；{target_date}{end_time_minus_1}至{end_time}最低价/{target_date}{end_time_minus_1}至{end_time}均价大于{low_avg_ratio_min}；{target_date}{mid_time}收盘价/{target_date}{start_time}至{mid_time}最高价大于{close_high_ratio_min}；{target_date}{end_time}量比大于{volume_ratio_min}；（{target_date}{end_time}量比/{target_date}{end_time_minus_1}量比）-（{target_date}{end_time_minus_1}量比/{target_date}{mid_time}量比）*0.95＞{volume_ratio_change_min}＜{volume_ratio_change_max}；{target_date}前1个交易日换手率/{target_date}前3个交易日换手率＜{turnover_prev_1_over_prev_3_max}且{target_date}前3个交易日换手率/{target_date}前120个交易日日均换手率＜{turnover_prev_3_over_prev_120_max}；{target_date}{end_time}换手率大于{current_turnover_min_pct}%小于{current_turnover_max_pct}%；{target_date}{start_time}至{end_time}特大单净额大于{large_order_net_min}万；（{target_date}{end_time_minus_1}至{end_time}特大单净额-{target_date}{start_time}至{end_time_minus_1}特大单净额）＞{large_order_net_delta_min}万；{target_date}前10个交易日成交均价/{target_date}前20个交易日成交均价大于{avg_price_10_over_20_min}；{target_date}前2个交易日振幅小于{prev_2_days_amplitude_max}；{target_date}前3个交易日非一字线非T字线；主板非ST且市值小于{market_cap_limit}亿";

const TIME_FORMAT: &str = "%H:%M";

/// Thresholds behind the default condition
///
/// Amounts are in 元, turnover bounds are fractions (0.004 = 0.4%).
/// Missing fields deserialize to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningCriteria {
    /// Window start, `HH:MM`
    pub start_time: String,
    /// Window end, `HH:MM`
    pub end_time: String,
    pub large_order_ranking: u32,
    /// Alternative ranking expressed as a percentage of the industry
    pub large_order_alt_ranking: u32,
    pub bid_amplitude_min: f64,
    pub bid_amplitude_max: f64,
    pub avg_price_ratio_min: f64,
    pub low_avg_ratio_min: f64,
    pub close_high_ratio_min: f64,
    pub volume_ratio_min: f64,
    pub volume_ratio_change_min: f64,
    pub volume_ratio_change_max: f64,
    /// Previous 1-day over previous 3-day turnover
    pub turnover_ratio_max: f64,
    /// Previous 3-day over previous 120-day average turnover
    pub avg_turnover_ratio_max: f64,
    pub current_turnover_min: f64,
    pub current_turnover_max: f64,
    pub large_order_net_amount_min: f64,
    pub large_order_net_amount_delta_min: f64,
    pub avg_price_ratio_10_20_min: f64,
    /// Previous 2-day amplitude ceiling
    pub amplitude_max: f64,
    pub market_cap_max: f64,
}

impl Default for ScreeningCriteria {
    fn default() -> Self {
        Self {
            start_time: "09:30".to_string(),
            end_time: "09:33".to_string(),
            large_order_ranking: 15,
            large_order_alt_ranking: 20,
            bid_amplitude_min: 0.0,
            bid_amplitude_max: 4.0,
            avg_price_ratio_min: 1.003,
            low_avg_ratio_min: 0.985,
            close_high_ratio_min: 0.985,
            volume_ratio_min: 3.0,
            volume_ratio_change_min: 0.01,
            volume_ratio_change_max: 0.33,
            turnover_ratio_max: 0.7,
            avg_turnover_ratio_max: 8.0,
            current_turnover_min: 0.004,
            current_turnover_max: 0.05,
            large_order_net_amount_min: 1_000_000.0,
            large_order_net_amount_delta_min: -10_000_000.0,
            avg_price_ratio_10_20_min: 0.98,
            amplitude_max: 18.6,
            market_cap_max: 20_000_000_000.0,
        }
    }
}

fn parse_time(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT)
        .map_err(|_| PromptError::InvalidTime(value.to_string()))
}

fn shift(time: NaiveTime, minutes: i64) -> String {
    let (shifted, _) = time.overflowing_add_signed(Duration::minutes(minutes));
    shifted.format(TIME_FORMAT).to_string()
}

impl ScreeningCriteria {
    /// One minute before the window end (the last full minute)
    pub fn end_time_minus_1(&self) -> Result<String> {
        Ok(shift(parse_time(&self.end_time)?, -1))
    }

    /// One minute after the window start (first snapshot)
    pub fn mid_time(&self) -> Result<String> {
        Ok(shift(parse_time(&self.start_time)?, 1))
    }

    /// Variables for [`DEFAULT_CONDITION_TEMPLATE`] on `date`
    pub fn variables(&self, date: TargetDate) -> Result<Variables> {
        let start = parse_time(&self.start_time)?;
        let end = parse_time(&self.end_time)?;

        Ok(Variables::with_target_date(date)
            .set("start_time", start.format(TIME_FORMAT).to_string())
            .set("end_time", end.format(TIME_FORMAT).to_string())
            .set("end_time_minus_1", shift(end, -1))
            .set("mid_time", shift(start, 1))
            .set("large_order_ranking", self.large_order_ranking)
            .set("large_order_alt_ranking", self.large_order_alt_ranking)
            .set("bid_amp_min", self.bid_amplitude_min)
            .set("bid_amp_max", self.bid_amplitude_max)
            .set("avg_price_ratio_min", self.avg_price_ratio_min)
            .set("low_avg_ratio_min", self.low_avg_ratio_min)
            .set("close_high_ratio_min", self.close_high_ratio_min)
            .set("volume_ratio_min", self.volume_ratio_min)
            .set("volume_ratio_change_min", self.volume_ratio_change_min)
            .set("volume_ratio_change_max", self.volume_ratio_change_max)
            .set("turnover_prev_1_over_prev_3_max", self.turnover_ratio_max)
            .set(
                "turnover_prev_3_over_prev_120_max",
                self.avg_turnover_ratio_max,
            )
            .set(
                "current_turnover_min_pct",
                format!("{:.1}", self.current_turnover_min * 100.0),
            )
            .set(
                "current_turnover_max_pct",
                format!("{:.0}", self.current_turnover_max * 100.0),
            )
            .set(
                "large_order_net_min",
                format!("{:.0}", self.large_order_net_amount_min / 10_000.0),
            )
            .set(
                "large_order_net_delta_min",
                self.large_order_net_amount_delta_min / 10_000.0,
            )
            .set("avg_price_10_over_20_min", self.avg_price_ratio_10_20_min)
            .set("prev_2_days_amplitude_max", self.amplitude_max)
            .set(
                "market_cap_limit",
                format!("{:.0}", self.market_cap_max / 1e8),
            ))
    }
}
