// 2.3 commodity.rs: MCX contract classification. the transaction rate is picked
// by group and the SEBI/CTT treatment by the agri flag.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommodityGroup {
    Normal,
    Castorseed,
    Kapas,
    Pepper,
    Rbdpmolein,
}

// agri contracts that still take the normal transaction rate
const AGRI_NORMAL_ROOTS: [&str; 4] = ["COTTON", "CARDAMOM", "MENTHAOIL", "CPO"];

impl CommodityGroup {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "NORMAL" => Some(CommodityGroup::Normal),
            "CASTORSEED" => Some(CommodityGroup::Castorseed),
            "KAPAS" => Some(CommodityGroup::Kapas),
            "PEPPER" => Some(CommodityGroup::Pepper),
            "RBDPMOLEIN" => Some(CommodityGroup::Rbdpmolein),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommodityGroup::Normal => "NORMAL",
            CommodityGroup::Castorseed => "CASTORSEED",
            CommodityGroup::Kapas => "KAPAS",
            CommodityGroup::Pepper => "PEPPER",
            CommodityGroup::Rbdpmolein => "RBDPMOLEIN",
        }
    }

    /// Classify an MCX trading symbol (e.g. `CASTORSEED24NOVFUT`) into its
    /// transaction group and agri flag.
    pub fn classify(trading_symbol: &str) -> CommodityClass {
        let symbol = trading_symbol.trim().to_ascii_uppercase();

        let special = [
            CommodityGroup::Castorseed,
            CommodityGroup::Kapas,
            CommodityGroup::Pepper,
            CommodityGroup::Rbdpmolein,
        ];
        if let Some(group) = special.into_iter().find(|g| symbol.starts_with(g.as_str())) {
            return CommodityClass { group, agri: true };
        }

        let agri = AGRI_NORMAL_ROOTS.iter().any(|root| symbol.starts_with(root));
        CommodityClass {
            group: CommodityGroup::Normal,
            agri,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommodityClass {
    pub group: CommodityGroup,
    pub agri: bool,
}
