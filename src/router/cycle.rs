use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Which account receives a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteTarget {
    ClientGateway,
    OperatorGateway,
}

impl RouteTarget {
    pub fn to_client(self) -> bool {
        matches!(self, RouteTarget::ClientGateway)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CycleConfigError {
    #[error("expected 'M:K' or 'M:K:O', got '{0}'")]
    Format(String),
    #[error("cycle length must be at least 1")]
    EmptyCycle,
    #[error("client slots ({client}) plus operator slots ({operator}) exceed cycle length {length}")]
    Overflow { length: u32, client: u32, operator: u32 },
}

/// Layout of one routing cycle: `client_slots` client positions, then
/// `operator_slots` operator positions, then client positions up to `length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleConfig {
    length: u32,
    client_slots: u32,
    operator_slots: u32,
}

impl CycleConfig {
    pub fn new(length: u32, client_slots: u32, operator_slots: u32) -> Result<Self, CycleConfigError> {
        if length == 0 {
            return Err(CycleConfigError::EmptyCycle);
        }
        if client_slots as u64 + operator_slots as u64 > length as u64 {
            return Err(CycleConfigError::Overflow {
                length,
                client: client_slots,
                operator: operator_slots,
            });
        }
        Ok(Self {
            length,
            client_slots,
            operator_slots,
        })
    }

    /// `M:K`, with the operator window filling the rest of the cycle.
    pub fn split(length: u32, client_slots: u32) -> Result<Self, CycleConfigError> {
        let operator = length
            .checked_sub(client_slots)
            .ok_or(CycleConfigError::Overflow {
                length,
                client: client_slots,
                operator: 0,
            })?;
        Self::new(length, client_slots, operator)
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn client_slots(&self) -> u32 {
        self.client_slots
    }

    pub fn operator_slots(&self) -> u32 {
        self.operator_slots
    }
}

impl FromStr for CycleConfig {
    type Err = CycleConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<u32> = s
            .split(':')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|_| CycleConfigError::Format(s.to_string()))?;

        match parts.as_slice() {
            [m, k] => Self::split(*m, *k),
            [m, k, o] => Self::new(*m, *k, *o),
            _ => Err(CycleConfigError::Format(s.to_string())),
        }
    }
}

impl fmt::Display for CycleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.length, self.client_slots, self.operator_slots)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDecision {
    pub target: RouteTarget,
    /// 1-based ordinal of the sale about to be created.
    pub ordinal: u64,
    /// `ordinal mod length`.
    pub position: u32,
    pub reason: String,
}

/// Counter-based splitter between the client's own gateway account and the
/// operator account. Pure: the same inputs always give the same route.
#[derive(Debug, Clone, Copy)]
pub struct GatewaySelector {
    cycle: CycleConfig,
}

impl GatewaySelector {
    pub fn new(cycle: CycleConfig) -> Self {
        Self { cycle }
    }

    pub fn cycle(&self) -> CycleConfig {
        self.cycle
    }

    pub fn select(&self, prior_sales: u64, use_tax: bool) -> RouteDecision {
        let ordinal = prior_sales + 1;
        let position = (ordinal % self.cycle.length as u64) as u32;
        let operator_window =
            position >= self.cycle.client_slots && position < self.cycle.client_slots + self.cycle.operator_slots;

        let (target, why) = match (operator_window, use_tax) {
            (false, _) => (RouteTarget::ClientGateway, "client_slot"),
            (true, true) => (RouteTarget::OperatorGateway, "operator_slot"),
            // The operator account is never used for offers that did not opt in.
            (true, false) => (RouteTarget::ClientGateway, "operator_slot_without_use_tax"),
        };

        RouteDecision {
            target,
            ordinal,
            position,
            reason: format!(
                "{}(ordinal={},position={},cycle={})",
                why, ordinal, position, self.cycle
            ),
        }
    }

    /// The next `count` decisions starting after `prior_sales` existing sales.
    pub fn schedule(&self, prior_sales: u64, use_tax: bool, count: usize) -> Vec<RouteDecision> {
        (0..count as u64)
            .map(|i| self.select(prior_sales + i, use_tax))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(selector: &GatewaySelector, n: u64, use_tax: bool) -> Vec<RouteTarget> {
        (0..n).map(|prior| selector.select(prior, use_tax).target).collect()
    }

    #[test]
    fn never_routes_to_operator_without_use_tax() {
        for cycle in ["10:7", "11:7:3", "7:0", "1:0:1"] {
            let selector = GatewaySelector::new(cycle.parse().unwrap());
            assert!(targets(&selector, 500, false)
                .iter()
                .all(|t| *t == RouteTarget::ClientGateway));
        }
    }

    #[test]
    fn ten_slot_cycle_splits_seven_three() {
        let selector = GatewaySelector::new("10:7".parse().unwrap());
        let decisions = selector.schedule(0, true, 10);
        let operator: Vec<u32> = decisions
            .iter()
            .filter(|d| d.target == RouteTarget::OperatorGateway)
            .map(|d| d.position)
            .collect();
        assert_eq!(operator, vec![7, 8, 9]);
        let ordinals: Vec<u64> = decisions
            .iter()
            .filter(|d| d.target == RouteTarget::OperatorGateway)
            .map(|d| d.ordinal)
            .collect();
        assert_eq!(ordinals, vec![7, 8, 9]);
        assert_eq!(decisions[9].position, 0);
        assert_eq!(
            decisions.iter().filter(|d| d.target.to_client()).count(),
            7
        );
    }

    #[test]
    fn eleven_slot_cycle_wraps_back_to_client() {
        let selector = GatewaySelector::new("11:8:3".parse().unwrap());
        let decisions = selector.schedule(0, true, 12);
        for d in &decisions {
            let expected = if (8..=10).contains(&d.ordinal) {
                RouteTarget::OperatorGateway
            } else {
                RouteTarget::ClientGateway
            };
            assert_eq!(d.target, expected, "ordinal {}", d.ordinal);
        }
        assert_eq!(decisions[9].position, 10);
        assert_eq!(decisions[10].position, 0);
        assert_eq!(decisions[11].position, 1);
    }

    #[test]
    fn ratio_converges_over_many_cycles() {
        let selector = GatewaySelector::new("10:7".parse().unwrap());
        let operator = targets(&selector, 1000, true)
            .into_iter()
            .filter(|t| *t == RouteTarget::OperatorGateway)
            .count();
        assert_eq!(operator, 300);
    }

    #[test]
    fn parses_and_validates_cycles() {
        let c: CycleConfig = "10:7".parse().unwrap();
        assert_eq!(c.operator_slots(), 3);
        assert_eq!(c.to_string(), "10:7:3");
        assert_eq!("0:0".parse::<CycleConfig>(), Err(CycleConfigError::EmptyCycle));
        assert!(matches!(
            "10:11".parse::<CycleConfig>(),
            Err(CycleConfigError::Overflow { .. })
        ));
        assert!(matches!(
            "10:7:4".parse::<CycleConfig>(),
            Err(CycleConfigError::Overflow { .. })
        ));
        assert!(matches!("ten".parse::<CycleConfig>(), Err(CycleConfigError::Format(_))));
    }

    #[test]
    fn reason_names_the_slot() {
        let selector = GatewaySelector::new("10:7".parse().unwrap());
        let d = selector.select(6, false);
        assert_eq!(d.target, RouteTarget::ClientGateway);
        assert!(d.reason.starts_with("operator_slot_without_use_tax(ordinal=7,position=7"));
    }
}
