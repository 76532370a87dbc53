use tracing::debug;

use gamebank_protocol::asset::{asset_times_price, Asset, Price, GBC, GBD};
use gamebank_protocol::config;

use super::Database;

impl Database {
    /// Once per feed interval, collect the scheduled witnesses' fresh price
    /// quotes, take their median, roll it into the history window, and
    /// re-derive the overall median, clamped so the debt token cannot exceed
    /// 10% of market cap.
    pub(crate) fn update_median_feed(&mut self) {
        if self.head_block_num() % config::FEED_INTERVAL_BLOCKS != 0 {
            return;
        }
        let now = self.head_block_time();
        let schedule = self.state.schedule().clone();

        let mut feeds: Vec<Price> = Vec::with_capacity(schedule.num_scheduled_witnesses as usize);
        for name in &schedule.current_shuffled_witnesses {
            if let Some(w) = self.state.witnesses.find_by_key(name) {
                if now < w.last_gbd_exchange_update + config::MAX_FEED_AGE_SECONDS
                    && !w.gbd_exchange_rate.is_null()
                {
                    feeds.push(w.gbd_exchange_rate);
                }
            }
        }

        if feeds.len() < config::MIN_FEEDS {
            return;
        }
        feeds.sort_by(|a, b| a.partial_cmp(b).expect("feeds share a symbol pair"));
        let median_feed = feeds[feeds.len() / 2];

        let dgp = self.state.dgp().clone();
        self.state.modify_feed(|fho| {
            fho.price_history.push(median_feed);
            if fho.price_history.len() > config::FEED_HISTORY_WINDOW {
                fho.price_history.remove(0);
            }

            let mut window = fho.price_history.clone();
            window.sort_by(|a, b| a.partial_cmp(b).expect("window shares a symbol pair"));
            fho.current_median_history = window[window.len() / 2];

            // debt ceiling: GBD may not exceed 10% of market cap, enforced
            // by flooring how much GBC a unit of GBD can claim
            let min_price = Price::new(
                Asset::new(9 * dgp.current_gbd_supply.amount, GBD),
                dgp.current_supply,
            );
            if min_price.base.amount > 0
                && min_price
                    .partial_cmp(&fho.current_median_history)
                    .map(|o| o.is_gt())
                    .unwrap_or(false)
            {
                fho.current_median_history = min_price;
            }
        });
        debug!(median = ?self.state.feed().current_median_history, "feed medianized");
    }

    /// Recompute the virtual supply and the debt print throttle.
    pub(crate) fn update_virtual_supply(&mut self) {
        let feed = self.state.feed().current_median_history;
        self.state.modify_dgp(|dgp| {
            dgp.virtual_supply = dgp.current_supply
                + if feed.is_null() {
                    Asset::zero(GBC)
                } else {
                    asset_times_price(dgp.current_gbd_supply, feed)
                };

            if !feed.is_null() && dgp.virtual_supply.amount > 0 {
                let gbd_in_gbc = asset_times_price(dgp.current_gbd_supply, feed);
                let percent_gbd = (gbd_in_gbc.amount as u128 * config::PERCENT_100 as u128
                    / dgp.virtual_supply.amount as u128) as u32;

                dgp.gbd_print_rate = if percent_gbd <= config::GBD_START_PERCENT {
                    config::PERCENT_100 as u16
                } else if percent_gbd >= config::GBD_STOP_PERCENT {
                    0
                } else {
                    (((config::GBD_STOP_PERCENT - percent_gbd) * config::PERCENT_100)
                        / (config::GBD_STOP_PERCENT - config::GBD_START_PERCENT))
                        as u16
                };
            }
        });
    }
}
