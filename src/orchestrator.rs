//! # Transaction Flow Orchestrator
//!
//! The `TransactionFlowOrchestrator` composes route resolution, quoting, balance
//! validation and approval gating into one user-facing decision, and builds, submits
//! and tracks the final router call.
//!
//! ## Overview
//!
//! The orchestrator:
//! - Holds the flow inputs (account, request, slippage) and one derived [`Node`] per
//!   dependent value (route, quote, pool, balances) plus one [`ApprovalGate`] per approval
//! - Invalidates only the nodes downstream of a changed input
//! - Hands out detached jobs for every chain read; a job finishing after its inputs were
//!   superseded is discarded when applied
//! - Exposes `{action, enabled, label}` through [`TransactionFlowOrchestrator::decision`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use collection_swap_sdk::orchestrator::{FlowRequest, TransactionFlowOrchestrator};
//! # use collection_swap_sdk::{cache::CacheManager, chain::ChainClient, context::ChainContext, types::SwapParameters};
//! # use std::sync::Arc;
//! # async fn run<C: ChainClient + 'static>(client: Arc<C>, ctx: ChainContext, params: SwapParameters, account: ethers::types::Address) -> Result<(), collection_swap_sdk::error::SwapError> {
//! let mut flow = TransactionFlowOrchestrator::new(client, Arc::new(CacheManager::new()), ctx);
//! flow.connect(account);
//! flow.set_request(FlowRequest::Swap(params));
//!
//! let decision = flow.refresh().await;
//! if decision.enabled && decision.action.is_approval() {
//!     flow.approve_next().await?;
//!     flow.confirm_approval().await?;
//! }
//! # Ok(())
//! # }
//! ```

use crate::approval::{ApprovalGate, ApprovalMode, ApprovalStatus};
use crate::cache::CacheManager;
use crate::chain::{ChainClient, TxOutcome};
use crate::context::ChainContext;
use crate::error::SwapError;
use crate::flow::{
    evaluate, Derived, FlowDecision, FlowInputs, FlowKind, FlowState, GatedPlan, Gate, Node, PendingApproval, Ticket,
    TransactionPhase, TransactionTracker,
};
use crate::metrics;
use crate::quote::{QuoteCalculator, SwapQuote};
use crate::repositories::{PoolRepository, RouterRepository};
use crate::router::{Route, RouteResolver};
use crate::slippage::SlippageTolerance;
use crate::types::{AddLiquidityParameters, RemoveLiquidityParameters, SwapParameters, Token};
use crate::validator::{BalanceValidator, ValidationResult};
use ethers::types::{Address, TxHash};
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the user asked the flow to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowRequest {
    Swap(SwapParameters),
    AddLiquidity(AddLiquidityParameters),
    RemoveLiquidity(RemoveLiquidityParameters),
}

impl FlowRequest {
    pub fn kind(&self) -> FlowKind {
        match self {
            FlowRequest::Swap(_) => FlowKind::Swap,
            FlowRequest::AddLiquidity(_) => FlowKind::AddLiquidity,
            FlowRequest::RemoveLiquidity(_) => FlowKind::RemoveLiquidity,
        }
    }

    pub fn validate(&self) -> Result<(), SwapError> {
        match self {
            FlowRequest::Swap(p) => p.validate(),
            FlowRequest::AddLiquidity(p) => p.validate(),
            FlowRequest::RemoveLiquidity(p) => p.validate(),
        }
    }

    pub fn slippage(&self) -> SlippageTolerance {
        match self {
            FlowRequest::Swap(p) => p.slippage,
            FlowRequest::AddLiquidity(p) => p.slippage,
            FlowRequest::RemoveLiquidity(p) => p.slippage,
        }
    }

    fn set_slippage(&mut self, slippage: SlippageTolerance) {
        match self {
            FlowRequest::Swap(p) => p.slippage = slippage,
            FlowRequest::AddLiquidity(p) => p.slippage = slippage,
            FlowRequest::RemoveLiquidity(p) => p.slippage = slippage,
        }
    }

    /// The asset pair the route or pool depends on.
    fn pair(&self) -> (FlowKind, &Token, &Token) {
        match self {
            FlowRequest::Swap(p) => (FlowKind::Swap, &p.from_token, &p.to_token),
            FlowRequest::AddLiquidity(p) => (FlowKind::AddLiquidity, &p.token, &p.collection),
            FlowRequest::RemoveLiquidity(p) => (FlowKind::RemoveLiquidity, &p.token, &p.collection),
        }
    }

    fn missing_selection(&self) -> Option<String> {
        let (ids_empty, amount_missing) = match self {
            FlowRequest::Swap(p) => (p.token_ids.as_ref().map_or(false, |ids| ids.is_empty()), false),
            FlowRequest::AddLiquidity(p) => (p.token_ids.is_empty(), p.amount_desired.is_zero()),
            FlowRequest::RemoveLiquidity(p) => (p.token_ids.is_empty(), p.liquidity.is_zero()),
        };
        if ids_empty {
            Some("Select NFTs".to_string())
        } else if amount_missing {
            Some("Enter an amount".to_string())
        } else {
            None
        }
    }
}

/// A detached chain read bound to the node revision it was started for.
pub struct FlowJob<T> {
    ticket: Ticket,
    future: BoxFuture<'static, Result<T, SwapError>>,
}

/// A finished [`FlowJob`], to be applied back to the orchestrator.
pub struct JobOutcome<T> {
    pub ticket: Ticket,
    pub result: Result<T, SwapError>,
}

impl<T> FlowJob<T> {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub async fn run(self) -> JobOutcome<T> {
        JobOutcome {
            ticket: self.ticket,
            result: self.future.await,
        }
    }
}

/// Coordinates one swap or liquidity flow for one chain context.
pub struct TransactionFlowOrchestrator<C: ChainClient + 'static> {
    ctx: ChainContext,
    client: Arc<C>,
    resolver: RouteResolver<C>,
    calculator: QuoteCalculator<C>,
    pools: PoolRepository<C>,
    validator: BalanceValidator<C>,
    approval_mode: ApprovalMode,

    account: Option<Address>,
    request: Option<FlowRequest>,

    route: Node<Route>,
    quote: Node<SwapQuote>,
    pool: Node<Option<Address>>,
    balances: Node<Vec<ValidationResult>>,
    plan: Option<Result<GatedPlan, SwapError>>,
    approvals: Vec<ApprovalGate<C>>,
    tracker: TransactionTracker,
}

impl<C: ChainClient + 'static> TransactionFlowOrchestrator<C> {
    pub fn new(client: Arc<C>, cache: Arc<CacheManager>, ctx: ChainContext) -> Self {
        let pools = PoolRepository::new(Arc::clone(&client), Arc::clone(&cache), ctx.clone());
        let router = RouterRepository::new(Arc::clone(&client), ctx.clone());
        let approval_mode = if ctx.max_approval {
            ApprovalMode::Max
        } else {
            ApprovalMode::Exact
        };

        Self {
            resolver: RouteResolver::new(pools.clone(), ctx.clone()),
            calculator: QuoteCalculator::new(router, pools.clone()),
            validator: BalanceValidator::new(Arc::clone(&client)),
            pools,
            client,
            ctx,
            approval_mode,
            account: None,
            request: None,
            route: Node::new("route"),
            quote: Node::new("quote"),
            pool: Node::new("pool"),
            balances: Node::new("balances"),
            plan: None,
            approvals: Vec::new(),
            tracker: TransactionTracker::new(),
        }
    }

    pub fn with_approval_mode(mut self, mode: ApprovalMode) -> Self {
        self.set_approval_mode(mode);
        self
    }

    pub fn context(&self) -> &ChainContext {
        &self.ctx
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn request(&self) -> Option<&FlowRequest> {
        self.request.as_ref()
    }

    pub fn route(&self) -> &Node<Route> {
        &self.route
    }

    pub fn quote(&self) -> &Node<SwapQuote> {
        &self.quote
    }

    pub fn pool(&self) -> &Node<Option<Address>> {
        &self.pool
    }

    pub fn balances(&self) -> &Node<Vec<ValidationResult>> {
        &self.balances
    }

    pub fn plan(&self) -> Option<&GatedPlan> {
        self.plan.as_ref().and_then(|p| p.as_ref().ok())
    }

    pub fn approvals(&self) -> &[ApprovalGate<C>] {
        &self.approvals
    }

    pub fn tracker(&self) -> &TransactionTracker {
        &self.tracker
    }

    // ------------------------------------------------------------------
    // Inputs
    // ------------------------------------------------------------------

    pub fn connect(&mut self, account: Address) {
        if self.account == Some(account) {
            return;
        }
        info!(?account, "account connected");
        self.account = Some(account);
        self.balances.invalidate();
        self.tracker.reset();
        self.sync_plan();
    }

    pub fn disconnect(&mut self) {
        self.account = None;
        self.balances.invalidate();
        self.tracker.reset();
        self.sync_plan();
    }

    /// Replaces the request. The route and pool survive when the asset pair is unchanged.
    pub fn set_request(&mut self, request: FlowRequest) {
        if self.request.as_ref() == Some(&request) {
            return;
        }
        let same_pair = self.request.as_ref().map(|r| r.pair()) == Some(request.pair());
        if !same_pair {
            self.route.invalidate();
            self.pool.invalidate();
        }
        debug!(kind = ?request.kind(), same_pair, "flow request changed");
        self.request = Some(request);
        self.quote.invalidate();
        self.balances.invalidate();
        self.tracker.reset();
        self.sync_plan();
    }

    pub fn clear_request(&mut self) {
        self.request = None;
        self.route.invalidate();
        self.pool.invalidate();
        self.quote.invalidate();
        self.balances.invalidate();
        self.tracker.reset();
        self.sync_plan();
    }

    pub fn set_slippage(&mut self, slippage: SlippageTolerance) {
        let mut request = match self.request.clone() {
            Some(request) => request,
            None => return,
        };
        if request.slippage() == slippage {
            return;
        }
        request.set_slippage(slippage);
        self.request = Some(request);
        self.quote.invalidate();
        self.balances.invalidate();
        self.tracker.reset();
        self.sync_plan();
    }

    pub fn set_approval_mode(&mut self, mode: ApprovalMode) {
        self.approval_mode = mode;
        for gate in &mut self.approvals {
            gate.set_mode(mode);
        }
    }

    // ------------------------------------------------------------------
    // Derived nodes
    // ------------------------------------------------------------------

    /// Route read for the current swap request, if the route is not known yet.
    pub fn route_job(&mut self) -> Option<FlowJob<Route>> {
        let params = match &self.request {
            Some(FlowRequest::Swap(p)) => p.clone(),
            _ => return None,
        };
        // Invalid parameters are reported live by the route gate
        if !self.route.is_idle() || params.validate().is_err() {
            return None;
        }
        let resolver = self.resolver.clone();
        let ticket = self.route.begin();
        Some(FlowJob {
            ticket,
            future: Box::pin(async move { resolver.resolve(&params).await }),
        })
    }

    pub fn apply_route(&mut self, outcome: JobOutcome<Route>) -> bool {
        if !self.route.complete(outcome.ticket, outcome.result) {
            return false;
        }
        self.quote.invalidate();
        self.sync_plan();
        true
    }

    /// Quote read for the current swap request once its route is known.
    pub fn quote_job(&mut self) -> Option<FlowJob<SwapQuote>> {
        let params = match &self.request {
            Some(FlowRequest::Swap(p)) => p.clone(),
            _ => return None,
        };
        let route = self.route.ready()?.clone();
        if !self.quote.is_idle() {
            return None;
        }
        let calculator = self.calculator.clone();
        let ticket = self.quote.begin();
        Some(FlowJob {
            ticket,
            future: Box::pin(async move { calculator.quote(&params, &route).await }),
        })
    }

    /// Applies a finished quote; `false` when its parameters were superseded.
    pub fn apply_quote(&mut self, outcome: JobOutcome<SwapQuote>) -> bool {
        if !self.quote.complete(outcome.ticket, outcome.result) {
            return false;
        }
        self.sync_plan();
        true
    }

    /// Pair lookup for the current liquidity request.
    pub fn pool_job(&mut self) -> Option<FlowJob<Option<Address>>> {
        let (token, collection) = match &self.request {
            Some(FlowRequest::AddLiquidity(p)) => (p.token.clone(), p.collection.clone()),
            Some(FlowRequest::RemoveLiquidity(p)) => (p.token.clone(), p.collection.clone()),
            _ => return None,
        };
        if !self.pool.is_idle() {
            return None;
        }
        let pools = self.pools.clone();
        let wrapped = self.ctx.wrapped_native;
        let ticket = self.pool.begin();
        Some(FlowJob {
            ticket,
            future: Box::pin(async move {
                pools
                    .pair_address(token.route_address(wrapped), collection.address)
                    .await
            }),
        })
    }

    pub fn apply_pool(&mut self, outcome: JobOutcome<Option<Address>>) -> bool {
        if !self.pool.complete(outcome.ticket, outcome.result) {
            return false;
        }
        self.sync_plan();
        true
    }

    /// Balance and ownership reads for the current plan.
    pub fn balances_job(&mut self) -> Option<FlowJob<Vec<ValidationResult>>> {
        let checks = match &self.plan {
            Some(Ok(plan)) => plan.checks.clone(),
            _ => return None,
        };
        if !self.balances.is_idle() {
            return None;
        }
        let validator = self.validator.clone();
        let ticket = self.balances.begin();
        Some(FlowJob {
            ticket,
            future: Box::pin(async move { validator.validate_all(&checks).await }),
        })
    }

    pub fn apply_balances(&mut self, outcome: JobOutcome<Vec<ValidationResult>>) -> bool {
        self.balances.complete(outcome.ticket, outcome.result)
    }

    /// Pulls every stale node in dependency order and returns the resulting decision.
    ///
    /// Read failures surface through the decision; they are not retried until the next call.
    pub async fn refresh(&mut self) -> FlowDecision {
        if matches!(self.tracker.phase(), TransactionPhase::Confirmed { .. }) {
            self.tracker.reset();
        }
        self.reset_retryable();

        if let Some(job) = self.route_job() {
            let outcome = job.run().await;
            self.apply_route(outcome);
        }
        if let Some(job) = self.quote_job() {
            let outcome = job.run().await;
            self.apply_quote(outcome);
        }
        if let Some(job) = self.pool_job() {
            let outcome = job.run().await;
            self.apply_pool(outcome);
        }
        if let Some(job) = self.balances_job() {
            let outcome = job.run().await;
            self.apply_balances(outcome);
        }
        for gate in &mut self.approvals {
            if gate.current_allowance().is_some() || gate.is_busy() {
                continue;
            }
            if let Some(job) = gate.begin_read() {
                let (ticket, result) = job.run().await;
                gate.complete_read(ticket, result);
            }
        }

        self.decision()
    }

    // Failed reads that may succeed on a second attempt are re-armed; refresh is the re-trigger
    fn reset_retryable(&mut self) {
        let retryable = |e: Option<&SwapError>| e.map_or(false, |e| e.is_retryable());
        if retryable(self.route.error()) {
            self.route.invalidate();
            self.quote.invalidate();
        }
        if retryable(self.quote.error()) {
            self.quote.invalidate();
        }
        if retryable(self.pool.error()) {
            self.pool.invalidate();
        }
        if retryable(self.balances.error()) {
            self.balances.invalidate();
        }
    }

    // Rebuilds the plan from the current inputs and re-points the approval gates
    fn sync_plan(&mut self) {
        let plan = match (&self.request, self.account) {
            (Some(request), Some(owner)) => self.build_plan(request, owner),
            _ => None,
        };

        let old_checks = self.plan().map(|p| p.checks.clone());
        let new_checks = plan.as_ref().and_then(|p| p.as_ref().ok()).map(|p| p.checks.clone());
        if old_checks != new_checks {
            self.balances.invalidate();
        }

        let keys = plan
            .as_ref()
            .and_then(|p| p.as_ref().ok())
            .map(|p| p.approvals.clone())
            .unwrap_or_default();
        self.approvals.truncate(keys.len());
        while self.approvals.len() < keys.len() {
            self.approvals
                .push(ApprovalGate::new(Arc::clone(&self.client), self.approval_mode));
        }
        for (gate, key) in self.approvals.iter_mut().zip(keys) {
            gate.retarget(Some(key));
        }

        self.plan = plan;
    }

    fn build_plan(&self, request: &FlowRequest, owner: Address) -> Option<Result<GatedPlan, SwapError>> {
        if request.missing_selection().is_some() {
            return None;
        }
        if let Err(e) = request.validate() {
            return Some(Err(e));
        }
        match request {
            FlowRequest::Swap(params) => {
                let quote = self.quote.ready()?;
                Some(GatedPlan::swap(params, quote, owner, &self.ctx))
            }
            FlowRequest::AddLiquidity(params) => {
                // Adding may create the pair, so only wait for the lookup to settle
                self.pool.ready()?;
                Some(Ok(GatedPlan::add_liquidity(params, owner, &self.ctx)))
            }
            FlowRequest::RemoveLiquidity(params) => match self.pool.ready()? {
                Some(lp) => Some(Ok(GatedPlan::remove_liquidity(params, *lp, owner, &self.ctx))),
                None => None,
            },
        }
    }

    // ------------------------------------------------------------------
    // Decision
    // ------------------------------------------------------------------

    pub fn inputs(&self) -> FlowInputs {
        let kind = self.request.as_ref().map_or(FlowKind::Swap, |r| r.kind());
        let missing_selection = match &self.request {
            None => Some("Select a token".to_string()),
            Some(request) => request.missing_selection(),
        };

        FlowInputs {
            kind,
            connected: self.account.is_some(),
            missing_selection,
            route: self.route_gate(),
            pool_exists: self.pool.ready().map(|p| p.is_some()),
            validation: self.validation_gate(),
            approvals: self.approvals_gate(),
            pending_approval: self.pending_approval(),
            transaction: self.tracker.phase().clone(),
        }
    }

    pub fn state(&self) -> FlowState {
        evaluate(&self.inputs())
    }

    pub fn decision(&self) -> FlowDecision {
        let kind = self.request.as_ref().map_or(FlowKind::Swap, |r| r.kind());
        self.state().project(kind)
    }

    fn route_gate(&self) -> Gate {
        let request = match &self.request {
            Some(request) => request,
            None => return Gate::Loading,
        };
        if let Err(e) = request.validate() {
            return Gate::Failed(e.user_message());
        }
        let upstream = match request {
            FlowRequest::Swap(_) => gate_of(&self.route).and(gate_of(&self.quote)),
            _ => gate_of(&self.pool),
        };
        match (upstream, &self.plan) {
            (Gate::Ready, Some(Err(e))) => Gate::Failed(e.user_message()),
            (gate, _) => gate,
        }
    }

    fn validation_gate(&self) -> Gate {
        match self.balances.value() {
            Derived::Ready(results) => {
                if results.iter().any(|r| r.is_loading) {
                    return Gate::Loading;
                }
                match results.iter().find_map(|r| r.validation_error.as_ref()) {
                    Some(e) => Gate::Failed(e.to_string()),
                    None => Gate::Ready,
                }
            }
            Derived::Failed(e) => Gate::Failed(e.user_message()),
            _ => Gate::Loading,
        }
    }

    fn approvals_gate(&self) -> Gate {
        for gate in &self.approvals {
            if let Some(e) = gate.read_error() {
                return Gate::Failed(e.user_message());
            }
            if gate.is_loading() {
                return Gate::Loading;
            }
        }
        Gate::Ready
    }

    // First gate, in request order, that is not approved yet
    fn pending_approval(&self) -> Option<PendingApproval> {
        let gate = self.approvals.iter().find(|g| !g.is_approved())?;
        let key = gate.key()?;
        if !(gate.is_busy() || gate.needs_approval()) {
            return None;
        }
        Some(PendingApproval {
            purpose: key.purpose,
            symbol: key.symbol.clone(),
            busy: gate.is_busy(),
        })
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Submits the first outstanding approval. Only valid while the decision offers it.
    pub async fn approve_next(&mut self) -> Result<TxHash, SwapError> {
        let decision = self.decision();
        if !(decision.enabled && decision.action.is_approval()) {
            return Err(SwapError::ApprovalFailed(format!(
                "no approval is available ({})",
                decision.label
            )));
        }
        let gate = self
            .approvals
            .iter_mut()
            .find(|g| *g.status() == ApprovalStatus::NeedsApproval)
            .ok_or_else(|| SwapError::ApprovalFailed("no approval is outstanding".to_string()))?;
        gate.submit_approval().await
    }

    /// Waits for a submitted approval to be mined and re-reads its allowance.
    pub async fn confirm_approval(&mut self) -> Result<ApprovalStatus, SwapError> {
        match self.approvals.iter_mut().find(|g| g.is_busy()) {
            Some(gate) => gate.confirm_approval().await,
            None => Ok(ApprovalStatus::Unknown),
        }
    }

    /// Builds and broadcasts the value-moving call. Refused unless the decision enables it.
    pub async fn execute(&mut self) -> Result<TxHash, SwapError> {
        let decision = self.decision();
        if !(decision.enabled && decision.action.is_value_moving()) {
            return Err(SwapError::TransactionFailed(format!(
                "{:?} is not available: {}",
                decision.action, decision.label
            )));
        }
        let account = self
            .account
            .ok_or_else(|| SwapError::TransactionFailed("no connected account".to_string()))?;
        let plan = self
            .plan()
            .cloned()
            .ok_or_else(|| SwapError::TransactionFailed("flow is not ready".to_string()))?;

        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let prepared = plan
            .call
            .prepare(self.ctx.router, account, self.ctx.deadline_from(now))?;
        let method = prepared.method;

        let attempt = self
            .tracker
            .start(method)
            .ok_or_else(|| SwapError::TransactionFailed("a transaction is already in flight".to_string()))?;
        debug!(%attempt, method, value = %prepared.value, "submitting router call");

        match self.client.send_transaction(account, prepared).await {
            Ok(tx) => {
                metrics::increment_transaction(method, "submitted");
                self.tracker.submitted(tx);
                Ok(tx)
            }
            Err(e) => {
                metrics::increment_transaction(method, "rejected");
                let err = match SwapError::contract_call(method, e) {
                    SwapError::ContractCall { source, .. } => SwapError::TransactionFailed(source.to_string()),
                    classified => classified,
                };
                self.tracker.failed(err.user_message());
                Err(err)
            }
        }
    }

    /// Waits for the submitted call, then forces every chain-derived node to be re-read.
    pub async fn confirm_execution(&mut self) -> Result<TxOutcome, SwapError> {
        let tx = self
            .tracker
            .pending_tx()
            .ok_or_else(|| SwapError::TransactionFailed("no transaction to confirm".to_string()))?;

        let outcome = match self.client.wait_for_receipt(tx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(?tx, error = %e, "waiting for receipt failed");
                let err = SwapError::TransactionFailed(format!("{:#}", e));
                self.tracker.failed(err.user_message());
                return Err(err);
            }
        };
        self.tracker.finished(&outcome);

        if !outcome.success {
            metrics::increment_transaction("router", "reverted");
            return Err(SwapError::TransactionFailed(format!("transaction {:?} reverted", tx)));
        }
        metrics::increment_transaction("router", "confirmed");
        self.invalidate_chain_state();
        Ok(outcome)
    }

    /// Drops every value read from the chain; the next `refresh` re-reads them.
    pub fn invalidate_chain_state(&mut self) {
        self.route.invalidate();
        self.pool.invalidate();
        self.quote.invalidate();
        self.balances.invalidate();
        for gate in &mut self.approvals {
            gate.invalidate();
        }
        self.sync_plan();
    }
}

fn gate_of<T>(node: &Node<T>) -> Gate {
    match node.value() {
        Derived::Ready(_) => Gate::Ready,
        Derived::Failed(e) => Gate::Failed(e.user_message()),
        _ => Gate::Loading,
    }
}
