pub mod referralmodel;
