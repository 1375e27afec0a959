mod helpers;
mod mocks;
mod payments;
mod transactions;
mod webhooks;
