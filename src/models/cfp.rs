//! CFP value model.
//!
//! A CFP set is the ordered collection of rows sharing one trace. Input sets hold exactly the four
//! non-total, non-response types; aggregated results add totals (parents) or are replaced by the
//! two-row response form (imported parts).

use uuid::Uuid;

wire_enum! {
    /// Unit the kgCO2e emission is reported against.
    pub enum GhgDeclaredUnit {
        /// kgCO2e per liter
        Liter => "kgCO2e/liter",
        /// kgCO2e per kilogram
        Kilogram => "kgCO2e/kilogram",
        /// kgCO2e per cubic meter
        CubicMeter => "kgCO2e/cubic-meter",
        /// kgCO2e per kilowatt-hour
        KilowattHour => "kgCO2e/kilowatt-hour",
        /// kgCO2e per megajoule
        Megajoule => "kgCO2e/megajoule",
        /// kgCO2e per ton-kilometer
        TonKilometer => "kgCO2e/ton-kilometer",
        /// kgCO2e per square meter
        SquareMeter => "kgCO2e/square-meter",
        /// kgCO2e per unit
        Unit => "kgCO2e/unit",
    }
}

wire_enum! {
    /// Unit of a child part's required amount; the empty literal means "not set".
    pub enum AmountRequiredUnit {
        /// liter
        Liter => "liter",
        /// kilogram
        Kilogram => "kilogram",
        /// cubic meter
        CubicMeter => "cubic-meter",
        /// kilowatt-hour
        KilowattHour => "kilowatt-hour",
        /// megajoule
        Megajoule => "megajoule",
        /// ton-kilometer
        TonKilometer => "ton-kilometer",
        /// square meter
        SquareMeter => "square-meter",
        /// unit
        Unit => "unit",
        /// not set
        NotSet => "",
    }
}

wire_enum! {
    /// Kind of a CFP row.
    pub enum CfpType {
        /// Own pre-processing emission
        PreProduction => "preProduction",
        /// Own main-processing emission
        MainProduction => "mainProduction",
        /// Pre-processing emission of components
        PreComponent => "preComponent",
        /// Main-processing emission of components
        MainComponent => "mainComponent",
        /// Derived pre-processing production total
        PreProductionTotal => "preProductionTotal",
        /// Derived main-processing production total
        MainProductionTotal => "mainProductionTotal",
        /// Derived pre-processing component total
        PreComponentTotal => "preComponentTotal",
        /// Derived main-processing component total
        MainComponentTotal => "mainComponentTotal",
        /// Pre-processing value propagated from the upstream partner
        PreProductionResponse => "preProductionResponse",
        /// Main-processing value propagated from the upstream partner
        MainProductionResponse => "mainProductionResponse",
    }
}

wire_enum! {
    /// Kind of data quality rating attached to a CFP row.
    pub enum DqrType {
        /// Pre-processing rating
        PreProcessing => "preProcessing",
        /// Main-processing rating
        MainProcessing => "mainProcessing",
        /// Pre-processing rating of totals
        PreProcessingTotal => "preProcessingTotal",
        /// Main-processing rating of totals
        MainProcessingTotal => "mainProcessingTotal",
        /// Pre-processing rating of response rows
        PreProcessingResponse => "preProcessingResponse",
        /// Main-processing rating of response rows
        MainProcessingResponse => "mainProcessingResponse",
    }
}

/// Processing stage a CFP or DQR type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Processing {
    /// Pre-processing (materials, upstream)
    Pre,
    /// Main processing (own manufacturing)
    Main,
}

impl CfpType {
    /// The four types a user supplies in a write, in canonical order.
    pub const INPUTS: [Self; 4] = [
        Self::PreProduction,
        Self::MainProduction,
        Self::PreComponent,
        Self::MainComponent,
    ];

    /// The DQR type this CFP type is always paired with.
    #[must_use]
    pub const fn dqr_type(self) -> DqrType {
        match self {
            Self::PreProduction | Self::PreComponent => DqrType::PreProcessing,
            Self::MainProduction | Self::MainComponent => DqrType::MainProcessing,
            Self::PreProductionTotal | Self::PreComponentTotal => DqrType::PreProcessingTotal,
            Self::MainProductionTotal | Self::MainComponentTotal => DqrType::MainProcessingTotal,
            Self::PreProductionResponse => DqrType::PreProcessingResponse,
            Self::MainProductionResponse => DqrType::MainProcessingResponse,
        }
    }

    /// Processing stage of this type.
    #[must_use]
    pub const fn processing(self) -> Processing {
        self.dqr_type().processing()
    }

    /// Whether the row is derived by aggregation.
    #[must_use]
    pub const fn is_total(self) -> bool {
        matches!(
            self,
            Self::PreProductionTotal
                | Self::MainProductionTotal
                | Self::PreComponentTotal
                | Self::MainComponentTotal
        )
    }

    /// Whether the row is the propagated form of an upstream answer.
    #[must_use]
    pub const fn is_response(self) -> bool {
        matches!(
            self,
            Self::PreProductionResponse | Self::MainProductionResponse
        )
    }

    /// Whether a user may supply this type in a write.
    #[must_use]
    pub const fn is_input(self) -> bool {
        !self.is_total() && !self.is_response()
    }

    /// Response type an upstream production row is converted into.
    #[must_use]
    pub const fn response_type(self) -> Option<Self> {
        match self {
            Self::PreProduction => Some(Self::PreProductionResponse),
            Self::MainProduction => Some(Self::MainProductionResponse),
            _ => None,
        }
    }
}

impl DqrType {
    /// Processing stage of this rating.
    #[must_use]
    pub const fn processing(self) -> Processing {
        match self {
            Self::PreProcessing | Self::PreProcessingTotal | Self::PreProcessingResponse => {
                Processing::Pre
            }
            Self::MainProcessing | Self::MainProcessingTotal | Self::MainProcessingResponse => {
                Processing::Main
            }
        }
    }
}

/// Data quality rating triple.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DqrValue {
    /// Technological representativeness
    pub ter: Option<f64>,
    /// Geographical representativeness
    pub ger: Option<f64>,
    /// Temporal representativeness
    pub tir: Option<f64>,
}

impl DqrValue {
    /// Fixed rating given to every total and response row.
    pub const STATIC_POLICY: Self = Self {
        ter: Some(2.1),
        ger: Some(0.0),
        tir: None,
    };

    /// Rating of an empty response row.
    pub const EMPTY: Self = Self {
        ter: None,
        ger: None,
        tir: None,
    };

    /// Components in TeR, GeR, TiR order, paired with their wire names.
    #[must_use]
    pub const fn components(&self) -> [(&'static str, Option<f64>); 3] {
        [("TeR", self.ter), ("GeR", self.ger), ("TiR", self.tir)]
    }

    /// Whether any component is strictly positive.
    #[must_use]
    pub fn has_positive(&self) -> bool {
        self.components()
            .iter()
            .any(|(_, value)| value.is_some_and(|v| v > 0.0))
    }
}

/// One CFP row.
#[derive(Debug, Clone, PartialEq)]
pub struct CfpModel {
    /// Identifier shared by all rows of a stored set; `None` on a fresh write and on response rows
    pub cfp_id: Option<Uuid>,
    /// Part the row belongs to
    pub trace_id: Uuid,
    /// Emission in kgCO2e per declared unit
    pub ghg_emission: Option<f64>,
    /// Declared unit; `None` only on an empty response row
    pub ghg_declared_unit: Option<GhgDeclaredUnit>,
    /// Row kind
    pub cfp_type: CfpType,
    /// Rating kind, always `cfp_type.dqr_type()` for accepted rows
    pub dqr_type: DqrType,
    /// Rating values
    pub dqr_value: DqrValue,
    /// Certificate references attached to the set
    pub cfp_certification_ids: Vec<String>,
}

impl CfpModel {
    /// A derived row with the static rating policy.
    #[must_use]
    pub fn derived(driver: &Self, cfp_type: CfpType, ghg_emission: Option<f64>) -> Self {
        Self {
            cfp_id: driver.cfp_id,
            trace_id: driver.trace_id,
            ghg_emission,
            ghg_declared_unit: driver.ghg_declared_unit,
            cfp_type,
            dqr_type: cfp_type.dqr_type(),
            dqr_value: DqrValue::STATIC_POLICY,
            cfp_certification_ids: driver.cfp_certification_ids.clone(),
        }
    }
}

/// Rows of one stored set whose identity fields have been checked to agree.
#[derive(Debug, Clone, PartialEq)]
pub struct CfpSet {
    rows: Vec<CfpModel>,
}

impl CfpSet {
    /// Wraps rows that were already checked for consistency.
    #[must_use]
    pub(crate) const fn new(rows: Vec<CfpModel>) -> Self {
        Self { rows }
    }

    /// Row of the given type, if present.
    #[must_use]
    pub fn row(&self, cfp_type: CfpType) -> Option<&CfpModel> {
        self.rows.iter().find(|row| row.cfp_type == cfp_type)
    }

    /// Emission of the given row, when both the row and its value exist.
    #[must_use]
    pub fn emission(&self, cfp_type: CfpType) -> Option<f64> {
        self.row(cfp_type).and_then(|row| row.ghg_emission)
    }

    /// First row, used as the template for derived rows.
    #[must_use]
    pub fn driver(&self) -> &CfpModel {
        &self.rows[0]
    }

    /// Declared unit shared by every row.
    #[must_use]
    pub fn declared_unit(&self) -> Option<GhgDeclaredUnit> {
        self.driver().ghg_declared_unit
    }

    /// All rows in stored order.
    #[must_use]
    pub fn rows(&self) -> &[CfpModel] {
        &self.rows
    }

    /// Consumes the set.
    #[must_use]
    pub fn into_rows(self) -> Vec<CfpModel> {
        self.rows
    }
}
