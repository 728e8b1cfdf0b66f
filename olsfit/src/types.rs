pub type Matrix = Vec<Vec<f64>>;

#[derive(Debug, Clone, Copy)]
pub struct InfoCriteria {
    pub ll: f64,
    pub aic: f64,
    pub bic: f64,
    pub hqic: f64,
}

#[derive(Debug, Clone)]
pub struct OlsFit {
    pub b: Vec<f64>,
    pub se: Vec<f64>,
    pub t: Vec<f64>,
    pub p: Vec<f64>,
    pub nobs: usize,
    pub rank: usize,
    pub df_resid: f64,
    pub ssr: f64,
    pub rsquared: f64,
    pub ic: InfoCriteria,
}

impl OlsFit {
    pub fn ll(&self) -> f64 {
        self.ic.ll
    }

    pub fn aic(&self) -> f64 {
        self.ic.aic
    }

    pub fn bic(&self) -> f64 {
        self.ic.bic
    }

    pub fn hqic(&self) -> f64 {
        self.ic.hqic
    }
}

/// Coefficients and p-values only; what a bootstrap draw keeps.
#[derive(Debug, Clone)]
pub struct OlsStripped {
    pub b: Vec<f64>,
    pub p: Vec<f64>,
}
