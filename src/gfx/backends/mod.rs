pub mod d3d11;
pub mod opengl;
