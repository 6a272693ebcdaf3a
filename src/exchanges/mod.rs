pub mod binance;
pub mod bitmart;
pub mod bybit;
pub mod gate;
pub mod mexc;
pub mod okx;
