use ptar_infra::{
    DeploymentTracker, LoanTracker, MaterialCatalog, QueryService, StockEngine, Warehouse,
};

/// Store components shared by every handler. All of them wrap clones of one pool.
#[derive(Debug, Clone)]
pub struct AppServices {
    warehouse: Warehouse,
    catalog: MaterialCatalog,
    engine: StockEngine,
    loans: LoanTracker,
    deployments: DeploymentTracker,
    queries: QueryService,
}

impl AppServices {
    pub fn new(warehouse: Warehouse) -> Self {
        Self {
            catalog: warehouse.catalog(),
            engine: warehouse.engine(),
            loans: warehouse.loans(),
            deployments: warehouse.deployments(),
            queries: warehouse.queries(),
            warehouse,
        }
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    pub fn catalog(&self) -> &MaterialCatalog {
        &self.catalog
    }

    pub fn engine(&self) -> &StockEngine {
        &self.engine
    }

    pub fn loans(&self) -> &LoanTracker {
        &self.loans
    }

    pub fn deployments(&self) -> &DeploymentTracker {
        &self.deployments
    }

    pub fn queries(&self) -> &QueryService {
        &self.queries
    }
}
