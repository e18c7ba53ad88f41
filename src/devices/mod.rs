// Currently the only supported family is the Keysight (formerly Agilent) InfiniiVision line of
// oscilloscopes.  Other families get their own module here.

pub mod infiniivision;
